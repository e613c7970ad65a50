pub mod git_repo;
