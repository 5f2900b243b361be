//! Reference frame helpers: sidereal time, WGS-84 station position and
//! topocentric look angles.

use chrono::{DateTime, Utc};

use super::{LookAngles, Observer};

const WGS84_A_KM: f64 = 6378.137;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
/// 2000-01-01T12:00:00Z
const J2000_UNIX_MS: i64 = 946_728_000_000;

/// Greenwich mean sidereal time (IAU 1982), in radians.
pub fn gmst(at: DateTime<Utc>) -> f64 {
    let days = (at.timestamp_millis() - J2000_UNIX_MS) as f64 / (1000.0 * SECONDS_PER_DAY);
    let centuries = days / DAYS_PER_JULIAN_CENTURY;

    let degrees = 280.460_618_37
        + 360.985_647_366_29 * days
        + 0.000_387_933 * centuries * centuries
        - centuries * centuries * centuries / 38_710_000.0;

    degrees.rem_euclid(360.0).to_radians()
}

/// Rotate a TEME position (km) into the Earth-fixed frame. Polar motion is
/// ignored.
pub fn teme_to_ecef(position: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_g, cos_g) = gmst.sin_cos();
    [
        cos_g * position[0] + sin_g * position[1],
        -sin_g * position[0] + cos_g * position[1],
        position[2],
    ]
}

/// Earth-fixed position of the observer, in km.
pub fn observer_ecef(observer: &Observer) -> [f64; 3] {
    let lat = observer.latitude.to_radians();
    let lon = observer.longitude.to_radians();
    let h = observer.altitude_m / 1000.0;

    let e2 = WGS84_F * (2.0 - WGS84_F);
    let n = WGS84_A_KM / (1.0 - e2 * lat.sin().powi(2)).sqrt();

    [
        (n + h) * lat.cos() * lon.cos(),
        (n + h) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + h) * lat.sin(),
    ]
}

/// Elevation and azimuth of an Earth-fixed target seen from `observer`.
pub fn look_angles(observer: &Observer, station: [f64; 3], target: [f64; 3]) -> LookAngles {
    let lat = observer.latitude.to_radians();
    let lon = observer.longitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    let rx = target[0] - station[0];
    let ry = target[1] - station[1];
    let rz = target[2] - station[2];

    let east = -sin_lon * rx + cos_lon * ry;
    let north = -sin_lat * cos_lon * rx - sin_lat * sin_lon * ry + cos_lat * rz;
    let up = cos_lat * cos_lon * rx + cos_lat * sin_lon * ry + sin_lat * rz;

    let elevation = up.atan2((east * east + north * north).sqrt());
    let azimuth = east.atan2(north).to_degrees().rem_euclid(360.0);

    LookAngles {
        elevation_deg: elevation.to_degrees(),
        azimuth_deg: azimuth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_gmst_at_j2000() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((gmst(j2000).to_degrees() - 280.460_618_37).abs() < EPS);
    }

    #[test]
    fn test_observer_ecef_equator_and_pole() {
        let equator = observer_ecef(&Observer::new(0.0, 0.0, 0.0));
        assert!((equator[0] - WGS84_A_KM).abs() < EPS);
        assert!(equator[1].abs() < EPS && equator[2].abs() < EPS);

        let pole = observer_ecef(&Observer::new(90.0, 0.0, 0.0));
        assert!((pole[2] - 6356.752).abs() < 1e-3);
    }

    #[test]
    fn test_look_angles_cardinal_directions() {
        let observer = Observer::new(0.0, 0.0, 0.0);
        let station = observer_ecef(&observer);

        let zenith = look_angles(&observer, station, [station[0] + 400.0, 0.0, 0.0]);
        assert!((zenith.elevation_deg - 90.0).abs() < EPS);

        let north = look_angles(&observer, station, [station[0], 0.0, 100.0]);
        assert!(north.elevation_deg.abs() < EPS);
        assert!(north.azimuth_deg.abs() < EPS);

        let east = look_angles(&observer, station, [station[0], 100.0, 0.0]);
        assert!((east.azimuth_deg - 90.0).abs() < EPS);

        let west = look_angles(&observer, station, [station[0], -100.0, 0.0]);
        assert!((west.azimuth_deg - 270.0).abs() < EPS);
    }

    #[test]
    fn test_teme_to_ecef_quarter_turn() {
        let rotated = teme_to_ecef([1.0, 0.0, 5.0], std::f64::consts::FRAC_PI_2);
        assert!(rotated[0].abs() < EPS);
        assert!((rotated[1] + 1.0).abs() < EPS);
        assert_eq!(rotated[2], 5.0);
    }
}
