use crate::document::Document;
use crate::config::Config;

// app structure
//  + cross-cutting concerns
//    - thread pool
//    - user config
//    - handle to the open document

pub struct App {
    pub document :Document,
    pub config :Config,
    pub background_jobs :BackgroundJobs,
}

#[derive(Clone)]
pub struct BackgroundJobs(threadpool::ThreadPool);

impl BackgroundJobs {
    pub fn new() -> Self { BackgroundJobs(threadpool::ThreadPool::new(2)) }

    pub fn execute(&mut self, job: impl FnOnce() + Send + 'static) {
        self.0.execute(job)
    }
}

pub trait BackgroundUpdates {
    fn check(&mut self);
}

pub trait UpdateTime {
    fn advance(&mut self, dt :f64);
}
