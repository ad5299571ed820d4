pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod batch_repo;
pub use batch_repo::BatchRepository;
