pub mod callback_dispatcher;
pub mod finalizer;
pub mod scheduler;
pub mod submission_router;

pub use callback_dispatcher::CallbackDispatcher;
pub use scheduler::Scheduler;
pub use submission_router::SubmissionRouter;
