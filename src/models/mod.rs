pub mod audit_log;
pub mod category;
pub mod comment;
pub mod like;
pub mod permission;
pub mod prompt;
pub mod status;
pub mod user;

pub use audit_log::{Entity as AuditLog, Model as AuditLogModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use comment::{Entity as Comment, Model as CommentModel};
pub use like::Entity as Like;
pub use permission::{Permission, PermissionMatrix};
pub use prompt::{Entity as Prompt, Model as PromptModel};
pub use status::{CommentStatus, PromptStatus, UserRole};
pub use user::{Entity as User, Model as UserModel};
