//! Master index: the deduplicated lookup tables loaded once per session.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::format::decode::shape_table_len;
use crate::format::{decode_routes, decode_shapes, Header, Manifest, GTFS_HEADER_SIZE};
use crate::identifiers::{HeadsignIndex, RouteIndex, ShapeIndex};
use crate::models::types::{ChunkInfo, FormatError, Headsign, Result, Route, Shape};
use crate::network::traits::{ByteRange, RangeFetcher};

/// Shapes, routes, headsigns and chunk locations of one binary file.
///
/// Immutable after load and safe to share between any number of readers.
#[derive(Clone, Debug, Default)]
pub struct MasterIndex {
    shapes: Vec<Shape>,
    routes: Vec<Route>,
    headsigns: Vec<Headsign>,
    chunk_index: BTreeMap<u32, ChunkInfo>,
}

impl MasterIndex {
    pub fn from_parts(
        shapes: Vec<Shape>,
        routes: Vec<Route>,
        headsigns: Vec<Headsign>,
        chunk_index: BTreeMap<u32, ChunkInfo>,
    ) -> Self {
        Self {
            shapes,
            routes,
            headsigns,
            chunk_index,
        }
    }

    /// Load the index of the binary file at `binary_url`.
    ///
    /// Issues two range requests against the binary file (header, then the
    /// tables) and one request for the sibling manifest, which is the only
    /// source of chunk locations.
    pub async fn load(fetcher: &dyn RangeFetcher, binary_url: &str) -> Result<Self> {
        let header_bytes = fetcher
            .fetch_range(binary_url, ByteRange::from_len(0, GTFS_HEADER_SIZE as u64))
            .await?;
        let header = Header::parse(&header_bytes)?;
        debug!(?header, "parsed binary header");

        let table_start = header.shape_table_offset as u64;
        let table_end = (header.table_fetch_end() as u64).max(table_start + 1);
        let tables = fetcher
            .fetch_range(
                binary_url,
                ByteRange {
                    start: table_start,
                    end: table_end - 1,
                },
            )
            .await?;

        let shapes = decode_shapes(&tables, header.shape_count)?;

        let route_start = (header.route_table_offset - header.shape_table_offset) as usize;
        let route_table_bounds_error = FormatError::OffsetOutOfBounds {
            section: "route table",
            offset: header.route_table_offset,
        };
        if shape_table_len(&tables, header.shape_count)? > route_start {
            return Err(route_table_bounds_error.into());
        }
        let route_bytes = tables.get(route_start..).ok_or(route_table_bounds_error)?;
        let routes = decode_routes(route_bytes, header.route_count)?;

        if header.headsign_count > u16::MAX as u32 + 1 {
            return Err(FormatError::Capacity {
                table: "headsigns",
                limit: u16::MAX as usize + 1,
            }
            .into());
        }
        let headsigns = (0..header.headsign_count)
            .map(|i| Headsign::Placeholder(HeadsignIndex::new(i as u16)))
            .collect();

        let manifest_bytes = fetcher.fetch(&Manifest::url_for(binary_url)).await?;
        let chunk_index = Manifest::parse(&manifest_bytes)?.chunk_index();
        if chunk_index.len() != header.chunk_count as usize {
            debug!(
                manifest = chunk_index.len(),
                header = header.chunk_count,
                "manifest and header disagree on chunk count"
            );
        }

        info!(
            shapes = header.shape_count,
            routes = header.route_count,
            headsigns = header.headsign_count,
            chunks = chunk_index.len(),
            "loaded master index"
        );

        Ok(Self {
            shapes,
            routes,
            headsigns,
            chunk_index,
        })
    }

    pub fn shape(&self, index: ShapeIndex) -> Option<&Shape> {
        self.shapes.get(index.as_usize())
    }

    pub fn route(&self, index: RouteIndex) -> Option<&Route> {
        self.routes.get(index.as_usize())
    }

    /// Headsign for `index`, a placeholder when the table has no entry.
    pub fn headsign(&self, index: HeadsignIndex) -> Headsign {
        self.headsigns
            .get(index.as_usize())
            .cloned()
            .unwrap_or(Headsign::Placeholder(index))
    }

    pub fn chunk(&self, hour: u32) -> Option<ChunkInfo> {
        self.chunk_index.get(&hour).copied()
    }

    /// Hours that have trip data, ascending.
    pub fn hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.chunk_index.keys().copied()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn headsign_count(&self) -> usize {
        self.headsigns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BinaryEncoder;
    use crate::models::trip::BinaryTrip;
    use crate::models::types::{RouteType, StreamError};
    use crate::network::MemoryFetcher;

    const URL: &str = "https://tiles.example/zurich/trips.bin";
    const MANIFEST_URL: &str = "https://tiles.example/zurich/trips.manifest.json";

    fn serve(encoder: BinaryEncoder) -> MemoryFetcher {
        let file = encoder.finish().unwrap();
        MemoryFetcher::new()
            .with_file(URL, file.binary)
            .with_file(MANIFEST_URL, serde_json::to_vec(&file.manifest).unwrap())
    }

    #[tokio::test]
    async fn test_shapes_round_trip() {
        let originals: Vec<Vec<f32>> = vec![
            vec![8.5417, 47.3769, 408.0, 8.5435, 47.3780, 409.5],
            vec![8.5, 47.3, 400.125],
            (0..300).map(|i| i as f32 * 0.001).collect(),
        ];

        let mut encoder = BinaryEncoder::new();
        for shape in &originals {
            encoder.add_shape(shape).unwrap();
        }
        let fetcher = serve(encoder);

        let index = MasterIndex::load(&fetcher, URL).await.unwrap();
        assert_eq!(index.shape_count(), originals.len());
        for (i, original) in originals.iter().enumerate() {
            let decoded = index.shape(ShapeIndex::new(i as u32)).unwrap();
            assert_eq!(decoded.coordinates.len(), original.len());
            for (a, b) in decoded.coordinates.iter().zip(original) {
                approx::assert_relative_eq!(*a, *b);
            }
        }
    }

    #[tokio::test]
    async fn test_routes_headsigns_and_chunks() {
        let mut encoder = BinaryEncoder::new();
        let shape = encoder.add_shape(&[0.0, 0.0, 400.0]).unwrap();
        let tram = encoder.add_route("10", RouteType::Tram, [0, 161, 224]).unwrap();
        encoder.add_route("31", RouteType::Trolleybus, [153, 153, 153]).unwrap();
        let headsign = encoder.add_headsign("Flughafen").unwrap();
        encoder.add_trip(BinaryTrip {
            shape_index: shape,
            route_index: tram,
            headsign_index: headsign,
            timestamps: vec![28800.0],
            start_time: 28800,
        });
        let fetcher = serve(encoder);

        let index = MasterIndex::load(&fetcher, URL).await.unwrap();
        assert_eq!(&*index.route(RouteIndex::new(0)).unwrap().name, "10");
        assert_eq!(
            index.route(RouteIndex::new(1)).unwrap().route_type,
            RouteType::Trolleybus
        );
        assert!(index.route(RouteIndex::new(2)).is_none());

        // Headsign text is not read back from the binary yet.
        assert_eq!(index.headsign_count(), 1);
        assert_eq!(index.headsign(HeadsignIndex::new(0)).to_string(), "Destination 0");

        assert_eq!(index.hours().collect::<Vec<_>>(), vec![8]);
        assert!(index.chunk(9).is_none());

        assert_eq!(fetcher.request_count(URL), 2);
        assert_eq!(fetcher.request_count(MANIFEST_URL), 1);
    }

    #[tokio::test]
    async fn test_bad_magic_fails_with_format_error() {
        let file = BinaryEncoder::new().finish().unwrap();
        let mut binary = file.binary;
        binary[..4].copy_from_slice(b"JUNK");
        let fetcher = MemoryFetcher::new()
            .with_file(URL, binary)
            .with_file(MANIFEST_URL, serde_json::to_vec(&file.manifest).unwrap());

        let error = MasterIndex::load(&fetcher, URL).await.unwrap_err();
        assert!(matches!(error, StreamError::Format(FormatError::BadMagic { .. })));
        // Nothing past the header is requested.
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_an_error() {
        let file = BinaryEncoder::new().finish().unwrap();
        let fetcher = MemoryFetcher::new()
            .with_file(URL, file.binary)
            .with_file(MANIFEST_URL, b"not json".to_vec());

        let error = MasterIndex::load(&fetcher, URL).await.unwrap_err();
        assert!(matches!(error, StreamError::Format(FormatError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_network_failure() {
        let fetcher = MemoryFetcher::new();
        let error = MasterIndex::load(&fetcher, URL).await.unwrap_err();
        assert!(matches!(error, StreamError::Http { status: 404, .. }));
    }
}
