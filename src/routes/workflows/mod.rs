mod crud;
mod ordering;
mod prelude;

pub use crud::{
    create_workflow, delete_workflow, get_workflow, list_workflows, update_workflow,
};
pub use ordering::{activate_workflow, pause_workflow, reorder_workflows};
