pub mod elections;
