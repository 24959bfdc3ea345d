mod device;

pub use device::DeviceViewModel;
