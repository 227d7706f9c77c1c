pub mod notification;
pub mod space;
pub mod unbind;
pub mod user;
