pub mod bitbucket_import;
