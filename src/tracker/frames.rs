use crate::tracker::{GeodeticFix, Vector3};

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

// WGS-84
const WGS84_A_M: f64 = 6_378_137.0;
const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Local tangent frame at a fixed point on the ellipsoid.
///
/// Axes follow the display convention: +x east, +y up, +z south.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    origin: Vector3,
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl LocalFrame {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
            origin: geodetic_to_ecef(latitude_deg, longitude_deg, altitude_m),
        }
    }

    /// Parse `"lat, lon"` in degrees.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=360.0).contains(&lon) {
            return None;
        }
        Some(Self::new(lat, lon, altitude_m.unwrap_or(0.0)))
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    /// Earth-fixed position of the frame origin, meters.
    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    pub fn to_local(&self, ecef: Vector3) -> Vector3 {
        let (east, north, up) = ecef_to_enu(ecef - self.origin, self.lat_rad(), self.lon_rad());
        Vector3::new(east, up, -north)
    }

    pub fn to_earth_fixed(&self, local: Vector3) -> Vector3 {
        let (east, up, north) = (local.x, local.y, -local.z);
        enu_to_ecef(east, north, up, self.lat_rad(), self.lon_rad()) + self.origin
    }
}

pub fn ecef_to_enu(dr: Vector3, lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr.x + cos_lon * dr.y;
    let north = -sin_lat * cos_lon * dr.x - sin_lat * sin_lon * dr.y + cos_lat * dr.z;
    let up = cos_lat * cos_lon * dr.x + cos_lat * sin_lon * dr.y + sin_lat * dr.z;
    (east, north, up)
}

pub fn enu_to_ecef(east: f64, north: f64, up: f64, lat_rad: f64, lon_rad: f64) -> Vector3 {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    Vector3::new(
        -sin_lon * east - sin_lat * cos_lon * north + cos_lat * cos_lon * up,
        cos_lon * east - sin_lat * sin_lon * north + cos_lat * sin_lon * up,
        cos_lat * north + sin_lat * up,
    )
}

pub fn geodetic_to_ecef(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Vector3 {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    Vector3::new(
        (n + altitude_m) * cos_lat * lon.cos(),
        (n + altitude_m) * cos_lat * lon.sin(),
        (n * (1.0 - WGS84_E2) + altitude_m) * sin_lat,
    )
}

/// Earth-fixed meters to WGS-84 longitude/latitude/height (Bowring iteration).
pub fn geodetic_from_ecef(ecef: Vector3) -> GeodeticFix {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let longitude = ecef.y.atan2(ecef.x);

    let mut lat = ecef.z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..6 {
        let sin_lat = lat.sin();
        let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        lat = (ecef.z + WGS84_E2 * n * sin_lat).atan2(p);
    }

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = WGS84_A_M / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let height = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        ecef.z.abs() - n * (1.0 - WGS84_E2)
    };

    GeodeticFix {
        longitude_deg: longitude.to_degrees(),
        latitude_deg: lat.to_degrees(),
        height_m: height,
    }
}
