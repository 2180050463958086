pub mod json_schema;

#[doc(hidden)]
pub mod test_support;
