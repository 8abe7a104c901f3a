pub mod home;
pub mod live;
pub mod upload;
