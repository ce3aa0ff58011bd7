//! Dual-mesh topology: points, edges, boundary markers and halo links.
//!
//! `DualMesh` is the read-only view the heat solver works on. All entities
//! live in flat arenas addressed by [`PointId`] or plain indices; nothing
//! holds pointers into another structure.
//!
//! Orientation conventions:
//! - an [`Edge`] normal points from its tail (`nodes[0]`) to its head
//!   (`nodes[1]`), its magnitude is the dual-face area;
//! - a [`BoundaryVertex`] normal points *into* the domain, its magnitude is
//!   the boundary face area.

use hashbrown::HashMap;
use once_cell::sync::OnceCell;

use crate::geometry::metrics::{Vec3, distance, norm};
use crate::heat_error::HeatError;
use crate::topology::point::PointId;

/// Geometric and ownership data for one dual-mesh point.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshPoint {
    pub coord: Vec3,
    /// Control-volume measure.
    pub volume: f64,
    /// Index of the point in the unpartitioned mesh.
    pub global_index: usize,
    /// `false` for ghost (halo) points owned by another partition.
    pub domain: bool,
}

/// Unit of flux exchange between two points.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub nodes: [PointId; 2],
    pub normal: Vec3,
}

impl Edge {
    #[inline]
    pub fn tail(&self) -> PointId {
        self.nodes[0]
    }

    #[inline]
    pub fn head(&self) -> PointId {
        self.nodes[1]
    }

    /// Dual-face area.
    #[inline]
    pub fn area(&self) -> f64 {
        norm(self.normal)
    }
}

/// A point restricted to a boundary marker.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundaryVertex {
    pub point: PointId,
    /// Inward-pointing boundary face normal.
    pub normal: Vec3,
    /// Interior point used for one-sided wall stencils.
    pub normal_neighbor: PointId,
}

impl BoundaryVertex {
    /// Boundary face area.
    #[inline]
    pub fn area(&self) -> f64 {
        norm(self.normal)
    }
}

/// A named boundary with its vertices in marker order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    tag: String,
    vertices: Vec<BoundaryVertex>,
}

impl Marker {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn vertices(&self) -> &[BoundaryVertex] {
        &self.vertices
    }
}

/// A send/receive marker pair shared with one peer partition.
///
/// `send[k]` on this rank is matched with `recv[k]` on the peer, in order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HaloLink {
    pub peer: usize,
    pub send: Vec<PointId>,
    pub recv: Vec<PointId>,
}

/// Read-only dual mesh of one partition.
#[derive(Debug)]
pub struct DualMesh {
    dim: usize,
    points: Vec<MeshPoint>,
    edges: Vec<Edge>,
    markers: Vec<Marker>,
    marker_index: HashMap<String, usize>,
    halo_links: Vec<HaloLink>,
    global_domain_points: usize,
    neighbors: OnceCell<Vec<Vec<PointId>>>,
}

impl DualMesh {
    /// Spatial dimension (2 or 3).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of local points, ghosts included.
    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Number of locally owned points.
    pub fn n_domain_points(&self) -> usize {
        self.points.iter().filter(|p| p.domain).count()
    }

    /// Number of owned points summed over all partitions.
    #[inline]
    pub fn global_domain_points(&self) -> usize {
        self.global_domain_points
    }

    #[inline]
    pub fn point(&self, p: PointId) -> &MeshPoint {
        &self.points[p.index()]
    }

    #[inline]
    pub fn points(&self) -> &[MeshPoint] {
        &self.points
    }

    #[inline]
    pub fn coord(&self, p: PointId) -> Vec3 {
        self.points[p.index()].coord
    }

    #[inline]
    pub fn volume(&self, p: PointId) -> f64 {
        self.points[p.index()].volume
    }

    #[inline]
    pub fn is_domain(&self, p: PointId) -> bool {
        self.points[p.index()].domain
    }

    /// Iterate local point handles in arena order.
    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        (0..self.points.len()).map(PointId::new)
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[inline]
    pub fn marker(&self, index: usize) -> &Marker {
        &self.markers[index]
    }

    /// Marker index for a tag.
    pub fn marker_index(&self, tag: &str) -> Result<usize, HeatError> {
        self.marker_index
            .get(tag)
            .copied()
            .ok_or_else(|| HeatError::UnknownMarker(tag.to_string()))
    }

    #[inline]
    pub fn halo_links(&self) -> &[HaloLink] {
        &self.halo_links
    }

    /// Distance from a boundary vertex to its normal neighbour.
    #[inline]
    pub fn wall_distance(&self, vertex: &BoundaryVertex) -> f64 {
        distance(self.coord(vertex.point), self.coord(vertex.normal_neighbor))
    }

    /// Edge-connected neighbours of every point, built on first use.
    pub fn neighbors(&self) -> &[Vec<PointId>] {
        self.neighbors.get_or_init(|| {
            let mut adj = vec![Vec::new(); self.points.len()];
            for edge in &self.edges {
                adj[edge.tail().index()].push(edge.head());
                adj[edge.head().index()].push(edge.tail());
            }
            adj
        })
    }
}

/// Incremental builder for [`DualMesh`].
///
/// Points added with [`MeshBuilder::point`] are owned and take their local
/// index as global index; partitioned meshes use [`MeshBuilder::point_with`].
#[derive(Clone, Debug, Default)]
pub struct MeshBuilder {
    dim: usize,
    points: Vec<MeshPoint>,
    edges: Vec<Edge>,
    markers: Vec<Marker>,
    halo_links: Vec<HaloLink>,
    global_domain_points: Option<usize>,
}

impl MeshBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ..Default::default()
        }
    }

    /// Add an owned point whose global index equals its local index.
    pub fn point(&mut self, coord: Vec3, volume: f64) -> PointId {
        let global = self.points.len();
        self.point_with(coord, volume, global, true)
    }

    /// Add a point with explicit global index and ownership.
    pub fn point_with(
        &mut self,
        coord: Vec3,
        volume: f64,
        global_index: usize,
        domain: bool,
    ) -> PointId {
        let id = PointId::new(self.points.len());
        self.points.push(MeshPoint {
            coord,
            volume,
            global_index,
            domain,
        });
        id
    }

    pub fn edge(&mut self, tail: PointId, head: PointId, normal: Vec3) -> &mut Self {
        self.edges.push(Edge {
            nodes: [tail, head],
            normal,
        });
        self
    }

    pub fn marker(&mut self, tag: impl Into<String>, vertices: Vec<BoundaryVertex>) -> &mut Self {
        self.markers.push(Marker {
            tag: tag.into(),
            vertices,
        });
        self
    }

    pub fn halo_link(&mut self, peer: usize, send: Vec<PointId>, recv: Vec<PointId>) -> &mut Self {
        self.halo_links.push(HaloLink { peer, send, recv });
        self
    }

    /// Override the global owned-point count (defaults to the local count).
    pub fn global_domain_points(&mut self, n: usize) -> &mut Self {
        self.global_domain_points = Some(n);
        self
    }

    /// Validate and freeze the mesh.
    pub fn build(self) -> Result<DualMesh, HeatError> {
        if !(2..=3).contains(&self.dim) {
            return Err(HeatError::InvalidGeometry(format!(
                "unsupported dimension {}",
                self.dim
            )));
        }
        let n = self.points.len();
        let check = |p: PointId| -> Result<(), HeatError> {
            if p.index() >= n {
                Err(HeatError::PointOutOfRange {
                    point: p.index(),
                    len: n,
                })
            } else {
                Ok(())
            }
        };

        for (i, point) in self.points.iter().enumerate() {
            if !point.volume.is_finite() || point.volume < 0.0 {
                return Err(HeatError::InvalidGeometry(format!(
                    "point {i} has volume {}",
                    point.volume
                )));
            }
        }
        for (e, edge) in self.edges.iter().enumerate() {
            check(edge.tail())?;
            check(edge.head())?;
            if edge.tail() == edge.head() {
                return Err(HeatError::InvalidGeometry(format!(
                    "edge {e} connects point {} to itself",
                    edge.tail()
                )));
            }
        }

        let mut marker_index = HashMap::with_capacity(self.markers.len());
        for (m, marker) in self.markers.iter().enumerate() {
            if marker_index.insert(marker.tag.clone(), m).is_some() {
                return Err(HeatError::InvalidGeometry(format!(
                    "duplicate marker tag `{}`",
                    marker.tag
                )));
            }
            for vertex in &marker.vertices {
                check(vertex.point)?;
                check(vertex.normal_neighbor)?;
                if vertex.point == vertex.normal_neighbor {
                    return Err(HeatError::InvalidGeometry(format!(
                        "marker `{}`: point {} is its own normal neighbour",
                        marker.tag, vertex.point
                    )));
                }
                let wall = distance(
                    self.points[vertex.point.index()].coord,
                    self.points[vertex.normal_neighbor.index()].coord,
                );
                if wall == 0.0 {
                    return Err(HeatError::InvalidGeometry(format!(
                        "marker `{}`: point {} coincides with its normal neighbour",
                        marker.tag, vertex.point
                    )));
                }
            }
        }
        for link in &self.halo_links {
            for &p in link.send.iter().chain(&link.recv) {
                check(p)?;
            }
        }

        let global_domain_points = self
            .global_domain_points
            .unwrap_or_else(|| self.points.iter().filter(|p| p.domain).count());

        Ok(DualMesh {
            dim: self.dim,
            points: self.points,
            edges: self.edges,
            markers: self.markers,
            marker_index,
            halo_links: self.halo_links,
            global_domain_points,
            neighbors: OnceCell::new(),
        })
    }
}
