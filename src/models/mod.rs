mod layout;

pub use layout::{AccountLayout, Column, NameOffsets, SheetLayout, SoaLayout};
