pub mod m4;

pub use m4::{decimate_m4_columns, decimate_m4_columns_into};
