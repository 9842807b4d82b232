//! The fixed table of runtime identifiers the emitted module imports.
//!
//! Process-wide and read-only; every emitted module pulls these from the
//! configured internal URL under their `$$`-prefixed aliases.

pub const FRAGMENT: &str = "$$Fragment";
pub const TEMPLATE_TAG: &str = "$$render";
pub const CREATE_ASTRO: &str = "$$createAstro";
pub const CREATE_COMPONENT: &str = "$$createComponent";
pub const RENDER_COMPONENT: &str = "$$renderComponent";
pub const RENDER_SLOT: &str = "$$renderSlot";
pub const UNESCAPE_HTML: &str = "$$unescapeHTML";
pub const ADD_ATTRIBUTE: &str = "$$addAttribute";
pub const SPREAD_ATTRIBUTES: &str = "$$spreadAttributes";
pub const DEFINE_STYLE_VARS: &str = "$$defineStyleVars";
pub const DEFINE_SCRIPT_VARS: &str = "$$defineScriptVars";
pub const CREATE_METADATA: &str = "$$createMetadata";

pub const METADATA: &str = "$$metadata";

/// `(exported name, local alias)` pairs, in import order.
pub const RUNTIME_IMPORTS: &[(&str, &str)] = &[
    ("Fragment", FRAGMENT),
    ("render", TEMPLATE_TAG),
    ("createAstro", CREATE_ASTRO),
    ("createComponent", CREATE_COMPONENT),
    ("renderComponent", RENDER_COMPONENT),
    ("renderSlot", RENDER_SLOT),
    ("unescapeHTML", UNESCAPE_HTML),
    ("addAttribute", ADD_ATTRIBUTE),
    ("spreadAttributes", SPREAD_ATTRIBUTES),
    ("defineStyleVars", DEFINE_STYLE_VARS),
    ("defineScriptVars", DEFINE_SCRIPT_VARS),
    ("createMetadata", CREATE_METADATA),
];
