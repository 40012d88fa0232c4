pub mod tasks;
pub mod work_entries;

pub use tasks::TaskService;
pub use work_entries::WorkEntryService;
