//! WGS84 geodetic and ECEF conversions

use nalgebra::Vector3;

/// WGS84 semi-major axis [m]
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis [m]
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 1.0 - (WGS84_B * WGS84_B) / (WGS84_A * WGS84_A);

/// A point given by its latitude and longitude [deg] and its height above the ellipsoid [m]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geodetic {
    pub lat: f64,
    pub lon: f64,
    pub height: f64,
}
impl Geodetic {
    pub fn new(lat: f64, lon: f64, height: f64) -> Self {
        Self { lat, lon, height }
    }
    /// ECEF coordinates [m]
    pub fn to_ecef(&self) -> Vector3<f64> {
        geodetic_to_ecef(self)
    }
}
impl From<[f64; 3]> for Geodetic {
    fn from([lat, lon, height]: [f64; 3]) -> Self {
        Self { lat, lon, height }
    }
}
impl From<(f64, f64, f64)> for Geodetic {
    fn from((lat, lon, height): (f64, f64, f64)) -> Self {
        Self { lat, lon, height }
    }
}

/// Converts geodetic coordinates to ECEF [m]
pub fn geodetic_to_ecef(point: &Geodetic) -> Vector3<f64> {
    let (slat, clat) = point.lat.to_radians().sin_cos();
    let (slon, clon) = point.lon.to_radians().sin_cos();
    // radius of curvature in the prime vertical
    let rn = WGS84_A / (1.0 - WGS84_E2 * slat * slat).sqrt();
    Vector3::new(
        (rn + point.height) * clat * clon,
        (rn + point.height) * clat * slon,
        (rn * (1.0 - WGS84_E2) + point.height) * slat,
    )
}

/// Converts ECEF coordinates [m] to geodetic coordinates
///
/// Bowring's closed form, sub-millimeter accurate for heights within the atmosphere.
pub fn ecef_to_geodetic(xyz: &Vector3<f64>) -> Geodetic {
    let (x, y, z) = (xyz[0], xyz[1], xyz[2]);
    let lon = y.atan2(x);
    let p = x.hypot(y);
    let ep2 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let (sth, cth) = (WGS84_A * z).atan2(WGS84_B * p).sin_cos();
    let lat = (z + ep2 * WGS84_B * sth.powi(3)).atan2(p - WGS84_E2 * WGS84_A * cth.powi(3));
    let (slat, clat) = lat.sin_cos();
    let rn = WGS84_A / (1.0 - WGS84_E2 * slat * slat).sqrt();
    let height = if clat.abs() > 1e-10 {
        p / clat - rn
    } else {
        z.abs() - WGS84_B
    };
    Geodetic {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
        height,
    }
}

/// Unit vector normal to the ellipsoid at the given latitude and longitude [deg]
pub fn local_up(lat: f64, lon: f64) -> Vector3<f64> {
    let (slat, clat) = lat.to_radians().sin_cos();
    let (slon, clon) = lon.to_radians().sin_cos();
    Vector3::new(clat * clon, clat * slon, slat)
}

/// Rotates a local East-North-Up vector at the given latitude and longitude [deg] into ECEF
pub fn enu_to_ecef(enu: &Vector3<f64>, lat: f64, lon: f64) -> Vector3<f64> {
    let (slat, clat) = lat.to_radians().sin_cos();
    let (slon, clon) = lon.to_radians().sin_cos();
    let (e, n, u) = (enu[0], enu[1], enu[2]);
    Vector3::new(
        -slon * e - slat * clon * n + clat * clon * u,
        clon * e - slat * slon * n + clat * slon * u,
        clat * n + slat * u,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_prime_meridian() {
        let xyz = Geodetic::new(0., 0., 0.).to_ecef();
        assert!((xyz[0] - WGS84_A).abs() < 1e-6);
        assert!(xyz[1].abs() < 1e-6);
        assert!(xyz[2].abs() < 1e-6);
    }

    #[test]
    fn north_pole() {
        let xyz = Geodetic::new(90., 0., 0.).to_ecef();
        assert!((xyz[2] - WGS84_B).abs() < 1e-6);
        let lla = ecef_to_geodetic(&xyz);
        assert!((lla.lat - 90.).abs() < 1e-9);
        assert!(lla.height.abs() < 1e-6);
    }

    #[test]
    fn ecef_geodetic_inverse() {
        for &(lat, lon, height) in &[
            (34.2, -118.17, 250.),
            (-35.273, 149.1, 12_000.),
            (64.8, 12.3, -40.),
            (0.5, 179.9, 15_000.),
        ] {
            let lla = ecef_to_geodetic(&Geodetic::new(lat, lon, height).to_ecef());
            assert!((lla.lat - lat).abs() < 1e-8, "{lla:?}");
            assert!((lla.lon - lon).abs() < 1e-8, "{lla:?}");
            assert!((lla.height - height).abs() < 1e-3, "{lla:?}");
        }
    }

    #[test]
    fn up_follows_the_normal() {
        let (lat, lon, height) = (45., 7., 100.);
        let start = Geodetic::new(lat, lon, height).to_ecef();
        let end = ecef_to_geodetic(&(start + local_up(lat, lon) * 1_000.));
        assert!((end.height - 1_100.).abs() < 1e-3);
        assert!((end.lat - lat).abs() < 1e-9);
    }

    #[test]
    fn enu_up_is_local_up() {
        let up = enu_to_ecef(&Vector3::z(), 20., 30.);
        assert!((up - local_up(20., 30.)).norm() < 1e-12);
        let east = enu_to_ecef(&Vector3::x(), 20., 30.);
        assert!(east.dot(&up).abs() < 1e-12);
        assert!((east.norm() - 1.).abs() < 1e-12);
    }
}
