//! Map viewport model.
//!
//! `MapView` stands in for the map widget: it owns the centre and zoom level
//! and derives the visible geographic bounds from them with a Web Mercator
//! projection, the same one the tile servers use.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 18;

/// Zoom used when focusing a single note.
pub const FOCUS_ZOOM: u8 = 15;

/// Latitude limit of the Mercator projection.
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Parses `"lat,lng"` as written in env vars and config files.
impl FromStr for LatLng {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected \"lat,lng\", got {:?}", s))?;
        let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude {:?}", lat))?;
        let lng: f64 = lng.trim().parse().map_err(|_| format!("bad longitude {:?}", lng))?;
        let at = LatLng::new(lat, lng);
        if !at.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(format!("coordinates out of range: {}", s));
        }
        Ok(at)
    }
}

/// Axis-aligned geographic box, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl GeoBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn contains(&self, at: LatLng) -> bool {
        at.lat >= self.south_west.lat
            && at.lat <= self.north_east.lat
            && at.lng >= self.south_west.lng
            && at.lng <= self.north_east.lng
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln()
}

fn mercator_lat(y: f64) -> f64 {
    (2.0 * y.exp().atan() - PI / 2.0).to_degrees()
}

/// The visible part of the map.
///
/// Size is measured in 256px tiles so that a zoom level shows the same
/// area it would in a browser of that size.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: LatLng,
    zoom: u8,
    width_tiles: f64,
    height_tiles: f64,
}

impl MapView {
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width_tiles: 4.0,
            height_tiles: 2.5,
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.center = LatLng::new(
            center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            center.lng.clamp(-180.0, 180.0),
        );
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Resize the viewport; non-positive sizes are ignored.
    pub fn set_size(&mut self, width_tiles: f64, height_tiles: f64) {
        if width_tiles > 0.0 && height_tiles > 0.0 {
            self.width_tiles = width_tiles;
            self.height_tiles = height_tiles;
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_view(self.center, self.zoom.saturating_add(1));
    }

    pub fn zoom_out(&mut self) {
        self.set_view(self.center, self.zoom.saturating_sub(1));
    }

    fn lng_span(&self) -> f64 {
        360.0 / f64::from(1u32 << self.zoom) * self.width_tiles
    }

    fn y_span(&self) -> f64 {
        2.0 * PI / f64::from(1u32 << self.zoom) * self.height_tiles
    }

    pub fn bounds(&self) -> GeoBounds {
        let half_lng = self.lng_span() / 2.0;
        let y = mercator_y(self.center.lat);
        let half_y = self.y_span() / 2.0;

        GeoBounds::new(
            LatLng::new(
                mercator_lat(y - half_y).max(-MAX_LATITUDE),
                (self.center.lng - half_lng).max(-180.0),
            ),
            LatLng::new(
                mercator_lat(y + half_y).min(MAX_LATITUDE),
                (self.center.lng + half_lng).min(180.0),
            ),
        )
    }

    /// Move the centre by a fraction of the visible span (positive = east/north).
    pub fn pan(&mut self, east: f64, north: f64) {
        let lng = self.center.lng + east * self.lng_span();
        let y = mercator_y(self.center.lat) + north * self.y_span();
        self.set_view(LatLng::new(mercator_lat(y), lng), self.zoom);
    }

    /// Geographic position under a point of the viewport, given as fractions
    /// of its width (from the left) and height (from the top).
    pub fn position_at(&self, x: f64, y: f64) -> LatLng {
        let x = x.clamp(0.0, 1.0);
        let y = y.clamp(0.0, 1.0);
        let lng = self.center.lng + (x - 0.5) * self.lng_span();
        let merc = mercator_y(self.center.lat) + (0.5 - y) * self.y_span();
        LatLng::new(
            mercator_lat(merc).clamp(-MAX_LATITUDE, MAX_LATITUDE),
            lng.clamp(-180.0, 180.0),
        )
    }
}
