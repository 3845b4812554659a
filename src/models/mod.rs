pub mod enums;

mod dispense;
mod patient;
mod prescription;
mod profile;

pub use dispense::DispenseEvent;
pub use patient::Patient;
pub use prescription::Prescription;
pub use profile::Profile;
