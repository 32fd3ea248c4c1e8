pub mod bitbucket;
pub mod migrate;

pub use bitbucket::BitbucketCommand;
pub use migrate::MigrateCommand;
