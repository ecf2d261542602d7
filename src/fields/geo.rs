//! Geographic points and their EWKB hex form
//!
//! Points are stored the way PostGIS prints a `geography(POINT,4326)`:
//! hex-encoded extended well-known binary with an SRID header.

use serde::{Deserialize, Serialize};

/// Spatial reference used by every stored point (WGS 84)
pub const SRID_WGS84: u32 = 4326;

/// Mean earth radius in meters, as used by spherical distance
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const WKB_POINT: u32 = 1;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;
const EWKB_Z_FLAG: u32 = 0x8000_0000;

/// A longitude/latitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Decode a hex EWKB (or plain WKB) point.
    pub fn from_ewkb_hex(input: &str) -> Result<Self, String> {
        let bytes = hex::decode(input.trim()).map_err(|e| format!("invalid hex: {}", e))?;
        let mut reader = WkbReader::new(&bytes)?;

        let geometry_type = reader.read_u32()?;
        if geometry_type & 0x0FFF_FFFF != WKB_POINT {
            return Err(format!("geometry type {} is not a point", geometry_type & 0xFF));
        }
        if geometry_type & EWKB_SRID_FLAG != 0 {
            let srid = reader.read_u32()?;
            if srid != SRID_WGS84 {
                return Err(format!("unsupported SRID {}", srid));
            }
        }

        let longitude = reader.read_f64()?;
        let latitude = reader.read_f64()?;
        if geometry_type & EWKB_Z_FLAG != 0 {
            reader.read_f64()?;
        }
        if geometry_type & EWKB_M_FLAG != 0 {
            reader.read_f64()?;
        }
        if !reader.is_empty() {
            return Err("trailing bytes after point".to_string());
        }

        Ok(Self::new(longitude, latitude))
    }

    /// Encode as little-endian EWKB hex with the WGS 84 SRID, uppercase like PostGIS.
    pub fn to_ewkb_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(1u8);
        bytes.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_le_bytes());
        bytes.extend_from_slice(&SRID_WGS84.to_le_bytes());
        bytes.extend_from_slice(&self.longitude.to_le_bytes());
        bytes.extend_from_slice(&self.latitude.to_le_bytes());
        hex::encode_upper(bytes)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

struct WkbReader<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> WkbReader<'a> {
    fn new(data: &'a [u8]) -> Result<Self, String> {
        let little_endian = match data.first() {
            Some(0) => false,
            Some(1) => true,
            Some(other) => return Err(format!("invalid byte order marker {}", other)),
            None => return Err("empty geometry".to_string()),
        };
        Ok(Self {
            data,
            pos: 1,
            little_endian,
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| "truncated geometry".to_string())?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32, String> {
        let raw = self.take::<4>()?;
        Ok(if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn read_f64(&mut self) -> Result<f64, String> {
        let raw = self.take::<8>()?;
        Ok(if self.little_endian {
            f64::from_le_bytes(raw)
        } else {
            f64::from_be_bytes(raw)
        })
    }

    fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_postgis_output() {
        // SELECT ST_GeogFromText('SRID=4326;POINT(10 50)')
        let point = GeoPoint::from_ewkb_hex("0101000020E610000000000000000024400000000000004940").unwrap();
        assert_eq!(point, GeoPoint::new(10.0, 50.0));
    }

    #[test]
    fn test_decode_big_endian_plain_wkb() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&(-3.5f64).to_be_bytes());
        bytes.extend_from_slice(&(40.25f64).to_be_bytes());

        let point = GeoPoint::from_ewkb_hex(&hex::encode(bytes)).unwrap();
        assert_eq!(point, GeoPoint::new(-3.5, 40.25));
    }

    #[test]
    fn test_encode_matches_postgis() {
        let point = GeoPoint::new(10.0, 50.0);
        assert_eq!(
            point.to_ewkb_hex(),
            "0101000020E610000000000000000024400000000000004940"
        );
    }

    #[test]
    fn test_rejects_non_point() {
        // LINESTRING header
        assert!(GeoPoint::from_ewkb_hex("010200000000000000").is_err());
        assert!(GeoPoint::from_ewkb_hex("zz").is_err());
        assert!(GeoPoint::from_ewkb_hex("").is_err());
    }

    #[test]
    fn test_rejects_truncated() {
        assert!(GeoPoint::from_ewkb_hex("0101000020E6100000000000000000").is_err());
    }

    #[test]
    fn test_distance() {
        let berlin = GeoPoint::new(13.405, 52.52);
        let paris = GeoPoint::new(2.3522, 48.8566);
        let km = berlin.distance_meters(&paris) / 1000.0;
        assert!((km - 878.0).abs() < 5.0, "got {}", km);
        assert_eq!(berlin.distance_meters(&berlin), 0.0);
    }
}
