//! The adaptive Delaunay mesh refiner.
//!
//! Starting from two triangles spanning the unit UV square, [`Refiner`]
//! inserts vertices wherever the composed pixel -> source-CRS -> target-CRS
//! reprojection, linearly interpolated across a triangle, deviates from the
//! true reprojection by more than a caller-chosen pixel budget, then restores
//! the Delaunay property by edge flips. This is the reprojection-error
//! analogue of Delatin's terrain-mesh refinement, generalized from the
//! teacher's `Geometry`-style parallel-array storage (`positions`, `uvs`,
//! `triangles` in the original renderer's `geometry.rs`) to the halfedge mesh
//! this algorithm needs.

use glam::DVec2;
use log::trace;

use crate::algorithm::{in_circle, orient2d};
use crate::error::{Error, Result};
use crate::mesh::heap::IndexedHeap;
use crate::reproject::ReprojectionFns;

/// The four fixed barycentric sample weights used for error estimation:
/// centroid and the three edge midpoints.
const SAMPLE_WEIGHTS: [(f64, f64, f64); 4] = [
    (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
    (0.5, 0.5, 0.0),
    (0.0, 0.5, 0.5),
    (0.5, 0.0, 0.5),
];

#[inline(always)]
fn next_he(e: u32) -> u32 {
    if e % 3 == 2 {
        e - 2
    } else {
        e + 1
    }
}

#[inline(always)]
fn prev_he(e: u32) -> u32 {
    if e % 3 == 0 {
        e + 2
    } else {
        e - 1
    }
}

/// An adaptive Delaunay mesh over the UV unit square `[0,1]^2`.
///
/// Owns its growable arrays exclusively for its lifetime (spec §5: no shared
/// state, no locks). `refine` and `run` are not reentrant.
pub struct Refiner<FT, IT, FR, IR>
where
    FT: Fn(f64, f64) -> (f64, f64),
    IT: Fn(f64, f64) -> (f64, f64),
    FR: Fn(f64, f64) -> (f64, f64),
    IR: Fn(f64, f64) -> (f64, f64),
{
    fns: ReprojectionFns<FT, IT, FR, IR>,
    width: u32,
    height: u32,

    uvs: Vec<DVec2>,
    exact_output_positions: Vec<DVec2>,
    /// Flattened triangle vertex indices; triangle `t`'s vertices live at
    /// `triangles[3t..3t+3]`.
    triangles: Vec<u32>,
    /// Parallel to `triangles`; `halfedges[e]` is the opposite half-edge's
    /// index, or `-1` on the hull boundary.
    halfedges: Vec<i64>,
    /// Per-triangle winning candidate UV from the last error estimate,
    /// indexed by triangle id (`edge_index / 3`).
    candidates_uv: Vec<DVec2>,
    queue: IndexedHeap,
    /// Triangle ids awaiting an error estimate and a push to `queue`.
    pending: Vec<u32>,
}

impl<FT, IT, FR, IR> std::fmt::Debug for Refiner<FT, IT, FR, IR>
where
    FT: Fn(f64, f64) -> (f64, f64),
    IT: Fn(f64, f64) -> (f64, f64),
    FR: Fn(f64, f64) -> (f64, f64),
    IR: Fn(f64, f64) -> (f64, f64),
{
    /// A summary dump (vertex/triangle counts and current worst error), not
    /// a field-by-field one — the reprojection closures aren't `Debug`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refiner")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("vertices", &self.uvs.len())
            .field("triangles", &self.triangle_count())
            .field("pending", &self.pending.len())
            .field("max_error", &self.get_max_error())
            .finish()
    }
}

impl<FT, IT, FR, IR> Refiner<FT, IT, FR, IR>
where
    FT: Fn(f64, f64) -> (f64, f64),
    IT: Fn(f64, f64) -> (f64, f64),
    FR: Fn(f64, f64) -> (f64, f64),
    IR: Fn(f64, f64) -> (f64, f64),
{
    /// Initialize a mesh of two triangles spanning `[0,1]^2` in UV space,
    /// mapped through `fns` onto a `width x height` source raster (spec
    /// §4.1 `create`).
    ///
    /// # Arguments
    ///
    /// * `fns` - The pixel/source-CRS/target-CRS reprojection functions the
    ///   refiner samples against.
    /// * `width` - Source raster width in pixels.
    /// * `height` - Source raster height in pixels.
    ///
    /// # Return
    ///
    /// A two-triangle mesh with both triangles pending their first error
    /// estimate.
    pub fn create(fns: ReprojectionFns<FT, IT, FR, IR>, width: u32, height: u32) -> Self {
        let uvs = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
        ];
        // Two triangles (3,0,2) and (0,3,1), sharing the diagonal (0,3).
        let triangles = vec![3, 0, 2, 0, 3, 1];
        let halfedges = vec![3, -1, -1, 0, -1, -1];

        let mut refiner = Self {
            fns,
            width,
            height,
            exact_output_positions: Vec::with_capacity(uvs.len()),
            uvs,
            triangles,
            halfedges,
            candidates_uv: vec![DVec2::ZERO; 2],
            queue: IndexedHeap::new(),
            pending: vec![0, 1],
        };
        for i in 0..refiner.uvs.len() {
            let uv = refiner.uvs[i];
            refiner.exact_output_positions.push(refiner.exact_output(uv));
        }
        refiner.flush_pending();
        refiner
    }

    /// Repeatedly refine while the worst triangle's error exceeds
    /// `max_error`.
    ///
    /// # Arguments
    ///
    /// * `max_error` - The pixel error budget; refinement stops once no
    ///   triangle's estimated error exceeds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `max_error <= 0`.
    pub fn run(&mut self, max_error: f64) -> Result<()> {
        if !(max_error > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "maxError must be positive, got {max_error}"
            )));
        }
        while self.get_max_error() > max_error {
            self.refine()?;
        }
        Ok(())
    }

    /// The current worst triangle's error, or `0.0` if none exceeds
    /// threshold (i.e. the queue is empty).
    ///
    /// # Return
    ///
    /// The largest queued triangle error, or `0.0`.
    pub fn get_max_error(&self) -> f64 {
        self.queue.peek_max_error()
    }

    /// UV-space vertex coordinates.
    ///
    /// # Return
    ///
    /// The mesh's vertices, in UV space.
    pub fn uvs(&self) -> &[DVec2] {
        &self.uvs
    }

    /// Flattened triangle vertex indices, three per triangle.
    ///
    /// # Return
    ///
    /// Vertex indices into [`Refiner::uvs`], three per triangle.
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Half-edge twin table, parallel to `triangles`.
    ///
    /// # Return
    ///
    /// For each half-edge, the opposite half-edge's index, or `-1` on the
    /// hull boundary.
    pub fn halfedges(&self) -> &[i64] {
        &self.halfedges
    }

    /// The output-CRS position computed for each vertex when it was
    /// inserted.
    ///
    /// # Return
    ///
    /// Target-CRS positions, parallel to [`Refiner::uvs`].
    pub fn exact_output_positions(&self) -> &[DVec2] {
        &self.exact_output_positions
    }

    /// Number of triangles currently in the mesh.
    ///
    /// # Return
    ///
    /// `triangles().len() / 3`.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    fn exact_output(&self, uv: DVec2) -> DVec2 {
        let px = uv.x * (self.width as f64 - 1.0);
        let py = uv.y * (self.height as f64 - 1.0);
        let (x, y) = self.fns.forward(px, py);
        DVec2::new(x, y)
    }

    fn triangle_uvs(&self, t: u32) -> [DVec2; 3] {
        let base = 3 * t as usize;
        [
            self.uvs[self.triangles[base] as usize],
            self.uvs[self.triangles[base + 1] as usize],
            self.uvs[self.triangles[base + 2] as usize],
        ]
    }

    fn triangle_outputs(&self, t: u32) -> [DVec2; 3] {
        let base = 3 * t as usize;
        [
            self.exact_output_positions[self.triangles[base] as usize],
            self.exact_output_positions[self.triangles[base + 1] as usize],
            self.exact_output_positions[self.triangles[base + 2] as usize],
        ]
    }

    /// Error estimate (spec §4.1 step 1): sample the triangle at four fixed
    /// barycentric points, keep the worst, and return `(error, candidate_uv)`.
    fn estimate_error(&self, t: u32) -> (f64, DVec2) {
        let uvs = self.triangle_uvs(t);
        let outputs = self.triangle_outputs(t);

        let mut worst_error = 0.0f64;
        let mut worst_uv = uvs[0];
        for &(w0, w1, w2) in &SAMPLE_WEIGHTS {
            let sample_uv = w0 * uvs[0] + w1 * uvs[1] + w2 * uvs[2];
            let lerped_output = w0 * outputs[0] + w1 * outputs[1] + w2 * outputs[2];
            let exact_pixel = DVec2::new(
                sample_uv.x * (self.width as f64 - 1.0),
                sample_uv.y * (self.height as f64 - 1.0),
            );
            let (rx, ry) = self.fns.inverse(lerped_output.x, lerped_output.y);
            let roundtrip_pixel = DVec2::new(rx, ry);
            let error = (exact_pixel - roundtrip_pixel).length();
            if error > worst_error {
                worst_error = error;
                worst_uv = sample_uv;
            }
        }

        if uvs.iter().any(|&v| v == worst_uv) {
            worst_error = 0.0;
        }
        (worst_error, worst_uv)
    }

    /// Run the error estimate for every pending triangle and push it onto
    /// the queue (spec §4.1 step 5).
    fn flush_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for t in pending {
            let (error, uv) = self.estimate_error(t);
            if t as usize >= self.candidates_uv.len() {
                self.candidates_uv.resize(t as usize + 1, DVec2::ZERO);
            }
            self.candidates_uv[t as usize] = uv;
            self.queue.push(t, error);
        }
    }

    /// Mark triangle `t` as needing a fresh error estimate: pull it out of
    /// the queue if it's sitting there (its cached error/candidate is now
    /// stale) and add it to `pending`, without duplicating an entry that's
    /// already pending.
    fn mark_pending(&mut self, t: u32) {
        self.queue.remove(t);
        if !self.pending.contains(&t) {
            self.pending.push(t);
        }
    }

    fn alloc_triangle(&mut self, verts: [u32; 3]) -> u32 {
        let t = self.triangles.len() as u32 / 3;
        self.triangles.extend_from_slice(&verts);
        self.halfedges.extend_from_slice(&[-1, -1, -1]);
        t
    }

    fn set_triangle(&mut self, t: u32, verts: [u32; 3]) {
        let base = 3 * t as usize;
        self.triangles[base..base + 3].copy_from_slice(&verts);
    }

    /// Link half-edge `e` to twin `twin`, and if `twin >= 0`, update the
    /// twin's own twin pointer back to `e`.
    fn link(&mut self, e: u32, twin: i64) {
        self.halfedges[e as usize] = twin;
        if twin >= 0 {
            self.halfedges[twin as usize] = e as i64;
        }
    }

    fn link_pair(&mut self, a: u32, b: u32) {
        self.halfedges[a as usize] = b as i64;
        self.halfedges[b as usize] = a as i64;
    }

    fn push_vertex(&mut self, uv: DVec2) -> u32 {
        let idx = self.uvs.len() as u32;
        self.uvs.push(uv);
        let output = self.exact_output(uv);
        self.exact_output_positions.push(output);
        idx
    }

    /// One split-and-legalize cycle, then flush pending triangles (spec
    /// §4.1 steps 3-5).
    ///
    /// # Errors
    ///
    /// Returns [`Error::BrokenTriangulation`] if the popped candidate does
    /// not lie within its own triangle — an internal invariant violation.
    pub fn refine(&mut self) -> Result<()> {
        let Some(t_star) = self.queue.pop_max() else {
            return Ok(());
        };
        let candidate = self.candidates_uv[t_star as usize];
        trace!("splitting triangle {t_star} at candidate {candidate:?}");
        let [uv0, uv1, uv2] = self.triangle_uvs(t_star);

        let s0 = orient2d(uv0, uv1, candidate);
        let s1 = orient2d(uv1, uv2, candidate);
        let s2 = orient2d(uv2, uv0, candidate);

        let p_new = self.push_vertex(candidate);

        // Triangles in this mesh are wound clockwise (the initial two
        // triangles in `create` and every triangle `split_interior`/
        // `split_edge` produce preserve that winding), so a point strictly
        // inside gives all three orient2d evaluations a negative sign.
        let (new_triangles, edges_to_legalize) = if s0 < 0.0 && s1 < 0.0 && s2 < 0.0 {
            self.split_interior(t_star, p_new)
        } else if s0 == 0.0 && s1 < 0.0 && s2 < 0.0 {
            self.split_edge(t_star, 0, p_new)
        } else if s1 == 0.0 && s0 < 0.0 && s2 < 0.0 {
            self.split_edge(t_star, 1, p_new)
        } else if s2 == 0.0 && s0 < 0.0 && s1 < 0.0 {
            self.split_edge(t_star, 2, p_new)
        } else {
            return Err(Error::BrokenTriangulation(
                "refinement candidate fell outside its own triangle".into(),
            ));
        };

        for edge in edges_to_legalize {
            self.legalize(edge);
        }
        for t in new_triangles {
            self.mark_pending(t);
        }
        self.flush_pending();
        Ok(())
    }

    /// Split triangle `t` (whose vertex is `p_new`'s exact interior point)
    /// into three triangles radiating from `p_new`.
    fn split_interior(&mut self, t: u32, p_new: u32) -> (Vec<u32>, Vec<u32>) {
        let base = 3 * t as usize;
        let v0 = self.triangles[base];
        let v1 = self.triangles[base + 1];
        let v2 = self.triangles[base + 2];
        let he0 = self.halfedges[base];
        let he1 = self.halfedges[base + 1];
        let he2 = self.halfedges[base + 2];

        let ta = t;
        let tb = self.alloc_triangle([v1, v2, p_new]);
        let tc = self.alloc_triangle([v2, v0, p_new]);
        self.set_triangle(ta, [v0, v1, p_new]);

        let (a0, a1, a2) = (3 * ta, 3 * ta + 1, 3 * ta + 2);
        let (b0, b1, b2) = (3 * tb, 3 * tb + 1, 3 * tb + 2);
        let (c0, c1, c2) = (3 * tc, 3 * tc + 1, 3 * tc + 2);

        self.link(a0, he0);
        self.link(b0, he1);
        self.link(c0, he2);
        self.link_pair(a1, b2);
        self.link_pair(a2, c1);
        self.link_pair(b1, c2);

        (vec![ta, tb, tc], vec![a0, b0, c0])
    }

    /// Split triangle `t` at the midpoint of its edge `k` (`k` in `0..3`),
    /// additionally splitting the twin triangle across that edge if it has
    /// one.
    ///
    /// `k` need not be `0` — the split edge is whichever local edge of `t`
    /// the candidate landed on, so slots are addressed by `next_he`/
    /// `prev_he` from `e0`, never assumed to sit at the triangle's base.
    fn split_edge(&mut self, t: u32, k: u32, p_new: u32) -> (Vec<u32>, Vec<u32>) {
        let base = 3 * t;
        let e0 = base + k;
        let e1 = next_he(e0);
        let e2 = prev_he(e0);
        let v0 = self.triangles[e0 as usize];
        let v1 = self.triangles[e1 as usize];
        let v2 = self.triangles[e2 as usize];
        let he = self.halfedges[e0 as usize];
        let old_he1 = self.halfedges[e1 as usize];

        // T1 = (v0, p_new, v2) reuses slot t in place: e0 keeps v0, e2 keeps
        // v2 (the apex, unchanged), only e1's content moves from v1 to
        // p_new. T2 = (p_new, v1, v2) is a fresh slot in natural order.
        let t1 = t;
        let t2 = self.alloc_triangle([p_new, v1, v2]);
        self.triangles[e1 as usize] = p_new;
        let (t1_0, t1_1, t1_2) = (e0, e1, e2);
        let (t2_0, t2_1, t2_2) = (3 * t2, 3 * t2 + 1, 3 * t2 + 2);

        self.link(t2_1, old_he1);
        self.link_pair(t1_1, t2_2);

        if he < 0 {
            self.link(t1_0, -1);
            self.link(t2_0, -1);
            return (vec![t1, t2], vec![t1_2, t2_1]);
        }

        let he = he as u32;
        let he_next = next_he(he);
        let he_prev = prev_he(he);
        let v3 = self.triangles[he_prev as usize];
        let old_he_next = self.halfedges[he_next as usize];
        let twin_triangle = he / 3;

        // T3 = (v1, p_new, v3) reuses the twin's slot, addressed the same
        // way: `he` keeps v1, `he_prev` keeps v3, only `he_next` moves from
        // v3... actually from whatever sat there to p_new.
        let t3 = twin_triangle;
        let t4 = self.alloc_triangle([p_new, v0, v3]);
        self.triangles[he_next as usize] = p_new;
        let (t3_0, t3_1, t3_2) = (he, he_next, he_prev);
        let (t4_0, t4_1, t4_2) = (3 * t4, 3 * t4 + 1, 3 * t4 + 2);

        self.link(t4_1, old_he_next);
        self.link_pair(t3_1, t4_2);

        self.link_pair(t1_0, t4_0);
        self.link_pair(t2_0, t3_0);

        (
            vec![t1, t2, t3, t4],
            vec![t1_2, t2_1, t3_2, t4_1],
        )
    }

    /// Legalize edge `a` (spec §4.1 step 4): if its twin's opposite vertex
    /// lies inside this triangle's circumcircle, flip the shared diagonal
    /// and recurse on the resulting quad's four outer edges.
    fn legalize(&mut self, a: u32) {
        let b = self.halfedges[a as usize];
        if b < 0 {
            return;
        }
        let b = b as u32;
        let al = next_he(a);
        let ar = prev_he(a);
        let bl = prev_he(b);
        let br = next_he(b);

        let a_start = self.uvs[self.triangles[a as usize] as usize];
        let a_end = self.uvs[self.triangles[al as usize] as usize];
        let p_l = self.uvs[self.triangles[ar as usize] as usize];
        let p_r = self.uvs[self.triangles[bl as usize] as usize];

        // `(a_start, a_end, p_l)` is a cyclic rotation of this triangle's
        // stored vertex order, which is wound clockwise throughout this mesh
        // (see the winding note in `refine`); `in_circle` assumes
        // counter-clockwise input, so the triangle is passed reversed here.
        if !in_circle(p_l, a_end, a_start, p_r) {
            return;
        }
        trace!("legalizing edge {a}: flipping shared diagonal");

        let v_p_l = self.triangles[ar as usize];
        let v_p_r = self.triangles[bl as usize];
        let h_ar = self.halfedges[ar as usize];
        let h_bl = self.halfedges[bl as usize];

        self.triangles[a as usize] = v_p_r;
        self.triangles[b as usize] = v_p_l;

        self.link(a, h_bl);
        self.link(b, h_ar);
        self.link_pair(ar, bl);

        // Both triangles sharing the flipped diagonal changed vertices; any
        // cached error estimate / candidate / queue slot for them is stale
        // (spec §4.1 step 4: "Remove the two old triangles from the queue
        // and enqueue replacements as pending").
        self.mark_pending(a / 3);
        self.mark_pending(b / 3);

        self.legalize(al);
        self.legalize(a);
        self.legalize(b);
        self.legalize(br);
    }
}
