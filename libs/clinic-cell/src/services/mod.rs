pub mod clinic;
pub mod geolocation;
pub mod overpass;
