pub mod liked;
