//! The CDT pipeline and its public entry points.
//!
//! [`compute_cdt`] is the single synchronous call that runs the whole
//! pipeline: input validation, Delaunay construction, segment and face
//! recovery, and region marking. All storage lives for the duration of
//! one call; nothing persists. Every failure mode collapses into a
//! [`CdtResult`] with `success == false` and empty arrays, so callers
//! never need a side channel to know whether they got a mesh. The
//! richer typed API, [`build_cdt`], is what the façade wraps.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::delaunay::{tetrahedrize, Inserter, TriangulationError};
use crate::core::face_recovery::recover_faces;
use crate::core::marking::mark_regions;
use crate::core::overlay::StructuredPlc;
use crate::core::plc::{InputPlc, PlcError};
use crate::core::segment_recovery::recover_segments;
use crate::core::tet_mesh::{TetMark, TetMesh};
use crate::geometry::fpu::{FpuError, FpuGuard};
use crate::geometry::point::VertexRep;

/// Options accepted by [`compute_cdt`].
///
/// # Examples
///
/// ```
/// use cdt3d::CdtOptionsBuilder;
///
/// let options = CdtOptionsBuilder::default()
///     .add_bounding_box(true)
///     .build()
///     .unwrap();
/// assert!(options.add_bounding_box);
/// assert!(!options.verbose);
/// ```
#[derive(Builder, Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[builder(default)]
pub struct CdtOptions {
    /// Append eight vertices just outside the input bounding box so
    /// every input vertex is strictly interior to the Delaunay hull.
    /// The box vertices receive the handles directly after the input
    /// vertices and are not counted in `num_input_vertices`.
    pub add_bounding_box: bool,
    /// Promote per-stage diagnostics from `debug` to `info` on the
    /// [`log`] facade. Has no effect on output values.
    pub verbose: bool,
}

/// The result record of a CDT computation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CdtResult {
    /// Output coordinates, x, y, z per vertex, input vertices first
    /// (bit-identical to the input), then any bounding-box vertices,
    /// then Steiner vertices.
    pub vertices: Vec<f64>,
    /// Four vertex indices per interior tetrahedron.
    pub tetrahedra: Vec<u32>,
    /// Number of caller-supplied vertices (bounding box excluded).
    pub num_input_vertices: u32,
    /// Number of Steiner vertices introduced by recovery.
    pub num_steiner_vertices: u32,
    /// Number of tetrahedra in `tetrahedra`.
    pub num_tetrahedra: u32,
    /// True iff the input surface was detected closed and 2-manifold.
    pub is_polyhedron: bool,
    /// True iff constraint recovery completed without failure.
    pub success: bool,
}

impl CdtResult {
    /// The all-empty failure record.
    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Counts reported by [`validate_mesh`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct MeshInfo {
    /// Number of vertices described by the coordinate array.
    pub num_vertices: u32,
    /// Number of triangles described by the index array.
    pub num_triangles: u32,
    /// Whether the arrays would be accepted by [`compute_cdt`].
    pub valid: bool,
}

/// Errors surfaced by the typed pipeline API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CdtError {
    /// The input arrays were rejected.
    #[error("invalid input: {source}")]
    InvalidInput {
        /// Validation failure.
        #[from]
        source: PlcError,
    },
    /// Tetrahedrization or recovery failed.
    #[error("tetrahedrization failed: {source}")]
    Triangulation {
        /// Underlying failure.
        #[from]
        source: TriangulationError,
    },
    /// The floating-point environment is unusable.
    #[error("floating-point environment rejected: {source}")]
    Fpu {
        /// Environment check failure.
        #[from]
        source: FpuError,
    },
}

/// Check whether packed input arrays describe a mesh that
/// [`compute_cdt`] would accept.
///
/// Agrees exactly with the input rejection of the computation path.
#[must_use]
pub fn validate_mesh(vertices: &[f64], triangles: &[u32]) -> MeshInfo {
    match InputPlc::from_packed(vertices, triangles) {
        Ok(plc) => MeshInfo {
            num_vertices: plc.num_vertices() as u32,
            num_triangles: plc.num_triangles() as u32,
            valid: true,
        },
        Err(err) => {
            log::debug!("validate_mesh: {err}");
            MeshInfo {
                num_vertices: (vertices.len() / 3) as u32,
                num_triangles: (triangles.len() / 3) as u32,
                valid: false,
            }
        }
    }
}

/// Compute the constrained Delaunay tetrahedrization of a PLC.
///
/// `vertices` holds x, y, z per vertex; `triangles` holds three vertex
/// indices per constraint triangle. On any failure — malformed input,
/// fully coplanar vertices, or unrecoverable constraints — the returned
/// record has `success == false`; invalid input additionally leaves the
/// arrays empty. Identical inputs produce bit-identical results.
///
/// # Examples
///
/// ```
/// use cdt3d::{compute_cdt, CdtOptions};
///
/// // A regular tetrahedron: already Delaunay, trivially constrained.
/// let vertices = [
///     0.0, 0.0, 0.0, //
///     1.0, 0.0, 0.0, //
///     0.0, 1.0, 0.0, //
///     0.0, 0.0, 1.0,
/// ];
/// let triangles = [0u32, 2, 1, 0, 1, 3, 1, 2, 3, 2, 0, 3];
/// let result = compute_cdt(&vertices, &triangles, &CdtOptions::default());
/// assert!(result.success);
/// assert!(result.is_polyhedron);
/// assert_eq!(result.num_tetrahedra, 1);
/// assert_eq!(result.num_steiner_vertices, 0);
/// ```
#[must_use]
pub fn compute_cdt(vertices: &[f64], triangles: &[u32], options: &CdtOptions) -> CdtResult {
    match build_cdt(vertices, triangles, options) {
        Ok(result) => result,
        Err(err) => {
            log::debug!("compute_cdt failed: {err}");
            CdtResult::failed()
        }
    }
}

/// The typed pipeline behind [`compute_cdt`].
///
/// # Errors
///
/// [`CdtError::InvalidInput`] for rejected arrays,
/// [`CdtError::Triangulation`] for degenerate geometry or a stalled
/// recovery, [`CdtError::Fpu`] if the floating-point environment fails
/// verification. A face-recovery failure on pathological input is not
/// an error: the record comes back with `success == false`.
pub fn build_cdt(
    vertices: &[f64],
    triangles: &[u32],
    options: &CdtOptions,
) -> Result<CdtResult, CdtError> {
    let _fpu = FpuGuard::acquire()?;
    let verbose = options.verbose;

    let mut plc = InputPlc::from_packed(vertices, triangles)?;
    if options.add_bounding_box {
        plc.add_bounding_box();
    }
    report(
        verbose,
        format_args!(
            "input: {} vertices, {} triangles{}",
            plc.num_input_vertices(),
            plc.num_triangles(),
            if plc.bounding_box_added() {
                " (+ bounding box)"
            } else {
                ""
            }
        ),
    );

    let mut mesh = TetMesh::new(
        (0..plc.num_vertices())
            .map(|i| VertexRep::Input(plc.vertex(i)))
            .collect(),
    );
    let mut stats = tetrahedrize(&mut mesh)?;
    report(
        verbose,
        format_args!("delaunay: {} tetrahedra (ghosts included)", mesh.num_tets()),
    );

    let mut overlay = StructuredPlc::build(&plc);
    let vertices_before_recovery = mesh.num_vertices();
    let mut inserter = Inserter::new();
    let mut success = true;
    match recover_segments(&mut mesh, &mut overlay, &mut inserter, &mut stats) {
        Ok(()) => {}
        Err(TriangulationError::RecoveryStall { message }) => {
            log::warn!("segment recovery failed: {message}");
            success = false;
        }
        Err(err) => return Err(err.into()),
    }
    if success {
        match recover_faces(&mut mesh, &mut overlay, &mut inserter, &mut stats) {
            Ok(ok) => success = ok,
            Err(TriangulationError::RecoveryStall { message }) => {
                log::warn!("face recovery failed: {message}");
                success = false;
            }
            Err(err) => return Err(err.into()),
        }
    }
    let num_steiner = mesh.num_vertices() - vertices_before_recovery;
    report(
        verbose,
        format_args!(
            "recovery: success = {success}, {num_steiner} Steiner vertices"
        ),
    );

    let inner = mark_regions(&mut mesh, &overlay);
    report(
        verbose,
        format_args!("marking: {inner} inner tetrahedra"),
    );

    let mut out_vertices = Vec::with_capacity(mesh.num_vertices() * 3);
    for v in 0..mesh.num_vertices() as u32 {
        let p = mesh.coord(v);
        out_vertices.extend([p.x, p.y, p.z]);
    }
    let mut out_tets = Vec::new();
    for t in mesh.tets() {
        // Ghosts are filtered even if a mark ever labelled one inner.
        if !mesh.is_ghost(t) && mesh.mark(t) == TetMark::In {
            out_tets.extend(mesh.nodes(t));
        }
    }
    let num_tetrahedra = (out_tets.len() / 4) as u32;
    Ok(CdtResult {
        vertices: out_vertices,
        tetrahedra: out_tets,
        num_input_vertices: plc.num_input_vertices() as u32,
        num_steiner_vertices: num_steiner as u32,
        num_tetrahedra,
        is_polyhedron: overlay.is_polyhedron,
        success,
    })
}

fn report(verbose: bool, args: std::fmt::Arguments<'_>) {
    if verbose {
        log::info!("{args}");
    } else {
        log::debug!("{args}");
    }
}
