//! XML parsing, navigation and conversion.

mod element;
mod mapper;
mod utils;

pub use element::{Element, Fragment, QName};
pub use mapper::{
    convert, convert_keyed, element_key, Mapping, NamespacePolicy, StructuredValue,
    ATTRIBUTE_PREFIX, TEXT_KEY,
};
pub use utils::{
    find_child, find_descendant, find_descendants, find_qualified_child, get_tag_name, get_text,
    has_qualified_tag, has_tag, parse_document, recover_markup,
};
