pub mod consolidation;
pub mod field_extractor;
pub mod row_index;
pub mod sheet_cursor;

#[cfg(test)]
pub(crate) mod test_support;
