pub mod photo_writer;
