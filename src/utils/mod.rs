pub mod crc32;
pub mod files;
pub mod struct_pack;
