pub mod android;

pub use android::{list_devices, AndroidDriver};
