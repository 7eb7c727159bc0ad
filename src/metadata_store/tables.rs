use redb::TableDefinition;

/// Image metadata: blob key -> ImageMetadata (msgpack)
pub const IMAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("images");

/// Accounts: username -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
