pub mod douyin;
pub mod kuaishou;
pub mod redbook;

pub use douyin::DouYinResolver;
pub use kuaishou::KuaiShouResolver;
pub use redbook::RedBookResolver;
