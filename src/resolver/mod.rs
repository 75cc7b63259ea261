pub mod models;
pub mod platform;
pub mod platforms;
pub mod registry;
pub mod state;
pub mod traits;

pub use models::{ImageItem, MediaAuthor, MediaInfo};
pub use platform::Platform;
pub use registry::ResolverRegistry;
pub use traits::ShareResolver;
