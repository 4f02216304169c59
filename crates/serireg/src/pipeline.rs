//! The registration pipeline (§5): drives C2 through C7 in order over one
//! configured set of slides, then hands everything that needs to touch
//! disk off to `serireg_io`. This module is the only place in the
//! workspace that owns a `rayon` thread pool or writes a file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use ndarray::{Array2, Array3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, warn};

use serireg_features::{build_pairwise_results, check_sufficient_matches, greedy_chain_order, stack_indices, FeatureDetector, GridPatchDetector, PairResult};
use serireg_io::{rtre, write_deformation_grid_preview, write_grayscale_png, write_overlap_preview, write_summary_csv, SetArtifact, SetLayout, SlideRecord, SummaryRow};
use serireg_nonrigid::{align_to_reference, apply_micro_update, check_memory_budget, nr_bbox, serial_compose, stitch_tiles, tile_grid, ConstantShiftSolver, IdentitySolver, NonRigidSolver};
use serireg_preprocess::{normalize_to_target, pool_stats, preprocess, resolve_size_budget, Preprocessed};
use serireg_rigid::{fit_full_rigid_chain, place_in_canonical_frame, FullRigidConfig, PairCorrespondence, SlideFit};
use serireg_slide::{read_scaled, SlideReader};
use serireg_warp::{none_crop_mask, overlap_crop_mask, reference_crop_mask, DisplacementField, ShapeRc, TransformClass};

use crate::{
    config_file::{CompositionStrategy, RegistrationConfig, SolverKind},
    error::{Report, TotalResult, Warning},
};

/// One configured slide entering the pipeline: its source path (recorded
/// verbatim in the set artifact) and the reader already opened against it.
pub struct SlideInput {
    pub path: PathBuf,
    pub reader: Box<dyn SlideReader>,
}

pub struct RunOutcome {
    pub artifact_path: PathBuf,
    pub summary_csv_path: PathBuf,
    pub reg_shape: ShapeRc,
    pub reference_idx: usize,
}

struct Staged {
    id: usize,
    proc_shape: ShapeRc,
    processed: Array2<u8>,
    denoised_for_rigid: Array2<u8>,
    mask: Array2<u8>,
}

/// Per-slide seeds are drawn from one run seed via a counter-advanced RNG,
/// so every detector/solver call stays fully determined by `config.seed`
/// (SPEC_FULL.md §9(c)) without slides sharing a single seed value.
fn derive_seed(run_seed: u64, counter: u64) -> u64 {
    use rand::Rng;
    let mut rng = ChaCha8Rng::seed_from_u64(run_seed);
    for _ in 0..counter {
        rng.gen::<u64>();
    }
    rng.gen()
}

fn build_solver(kind: SolverKind) -> Box<dyn NonRigidSolver> {
    match kind {
        SolverKind::Identity => Box::new(IdentitySolver),
        SolverKind::ConstantShift => Box::new(ConstantShiftSolver { dx: 0.0, dy: 0.0 }),
    }
}

fn build_detector(kind: crate::config_file::DetectorKind) -> Box<dyn FeatureDetector> {
    match kind {
        crate::config_file::DetectorKind::GridPatch => Box::new(GridPatchDetector::default()),
    }
}

fn crop_mask_for(mode: serireg_warp::CropMode, warped_masks: &[Array2<u8>], reference_mask: &Array2<u8>) -> (Array2<u8>, serireg_warp::BboxXywh) {
    match mode {
        serireg_warp::CropMode::Overlap => overlap_crop_mask(warped_masks, reference_mask),
        serireg_warp::CropMode::Reference => reference_crop_mask(reference_mask),
        serireg_warp::CropMode::None => none_crop_mask(reference_mask.dim()),
    }
}

fn gray_to_rgb3(img: &Array2<u8>) -> Array3<u8> {
    let (rows, cols) = img.dim();
    Array3::from_shape_fn((1, rows, cols), |(_, r, c)| img[[r, c]])
}

/// Run the full pipeline (C2 through C7) over `slides` and write every
/// artifact `serireg_io` knows how to produce into `config.output_dir`.
pub fn run_register(config: &RegistrationConfig, slides: Vec<SlideInput>) -> TotalResult<RunOutcome> {
    let mut warnings: Vec<Warning> = Vec::new();
    let mut errors: Vec<anyhow::Error> = Vec::new();

    if slides.is_empty() {
        return Err(Report { errors: vec![anyhow::anyhow!("no slides configured")] });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers.max(1))
        .build()
        .map_err(|e| Report { errors: vec![e.into()] })?;

    let layout = SetLayout::new(&config.output_dir);
    if let Err(e) = layout.create_all() {
        return Err(Report { errors: vec![e.into()] });
    }

    let longest_sides: Vec<u32> = slides.iter().map(|s| s.reader.dimensions()[0].0.max(s.reader.dimensions()[0].1)).collect();
    let budget = resolve_size_budget(config.max_img_dim, config.max_proc_dim, &longest_sides);

    info!(n = slides.len(), max_img_dim = budget.max_img_dim, max_proc_dim = budget.max_proc_dim, "starting registration run");

    let staging_bar = indicatif::ProgressBar::new(slides.len() as u64).with_message("reading + preprocessing slides");

    // C2/C3: read + preprocess every slide, in parallel, preserving input order.
    let staged_results: Vec<Result<Staged>> = pool.install(|| {
        slides
            .par_iter()
            .enumerate()
            .map(|(id, input)| -> Result<Staged> {
                let modality = input.reader.guess_modality();
                let img_full = read_scaled(input.reader.as_ref(), budget.max_img_dim).with_context(|| format!("reading {}", input.path.display()))?;
                let img_proc = read_scaled(input.reader.as_ref(), budget.max_proc_dim).with_context(|| format!("reading {} at processing resolution", input.path.display()))?;
                let Preprocessed { processed, denoised_for_rigid, mask } = preprocess(&img_proc, modality, 0);
                let proc_shape = (processed.dim().0, processed.dim().1);

                let img_full_u8 = serireg_preprocess::convert::to_u8(&img_full);
                write_grayscale_png(&layout.images().join(format!("{id}.png")), &Array2::from_shape_fn((img_full_u8.dim().1, img_full_u8.dim().2), |(r, c)| img_full_u8[[0, r, c]]))
                    .with_context(|| format!("writing image thumbnail for slide {id}"))?;
                write_grayscale_png(&layout.masks().join(format!("{id}.png")), &mask).with_context(|| format!("writing mask thumbnail for slide {id}"))?;

                staging_bar.inc(1);
                Ok(Staged { id, proc_shape, processed, denoised_for_rigid, mask })
            })
            .collect()
    });
    staging_bar.finish_and_clear();
    let mut staged = Vec::with_capacity(staged_results.len());
    for result in staged_results {
        match result {
            Ok(s) => staged.push(s),
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }
    staged.sort_by_key(|s| s.id);

    // Pooled normalization across the whole set.
    let processed_images: Vec<Array2<u8>> = staged.iter().map(|s| s.processed.clone()).collect();
    let target_stats = pool_stats(&processed_images, config.normalization_mode);
    let normalized: Vec<Array2<u8>> = processed_images.iter().map(|img| normalize_to_target(img, &target_stats)).collect();

    // C4: feature detection and matching.
    let detector = build_detector(config.detector.kind);
    let feature_sets: Vec<_> = staged
        .iter()
        .enumerate()
        .map(|(i, s)| detector.detect(&s.denoised_for_rigid, derive_seed(config.seed, i as u64)))
        .collect();
    let results = build_pairwise_results(&feature_sets, TransformClass::Similarity, config.detector.ransac_iterations, config.detector.ransac_inlier_threshold_px, config.seed);
    if let Err(e) = check_sufficient_matches(staged.len(), &results) {
        return Err(Report { errors: vec![e.into()] });
    }
    let similarity = serireg_features::similarity_matrix_from_results(staged.len(), &results);
    let order = if staged.len() <= 2 { (0..staged.len()).collect::<Vec<_>>() } else { greedy_chain_order(&similarity) };
    let stack_idx = stack_indices(&order);

    let mut correspondences: IndexMap<(usize, usize), PairCorrespondence> = IndexMap::new();
    for i in 0..staged.len() {
        for j in (i + 1)..staged.len() {
            let Some(PairResult { inliers, .. }) = &results[i][j] else { continue };
            let src_pts: Vec<[f64; 2]> = inliers.iter().map(|m| [feature_sets[i].keypoints[m.i][0] as f64, feature_sets[i].keypoints[m.i][1] as f64]).collect();
            let dst_pts: Vec<[f64; 2]> = inliers.iter().map(|m| [feature_sets[j].keypoints[m.j][0] as f64, feature_sets[j].keypoints[m.j][1] as f64]).collect();
            correspondences.insert((i, j), PairCorrespondence { moving: i, fixed: j, src_pts: src_pts.clone(), dst_pts: dst_pts.clone() });
            correspondences.insert((j, i), PairCorrespondence { moving: j, fixed: i, src_pts: dst_pts, dst_pts: src_pts });
        }
    }

    // §4.4 neighbor-refined matches: re-filter each order-adjacent pair's
    // inliers against that pair's own rigid fit, so outliers consistent with
    // a different slide permutation are dropped before they reach the chain
    // fit. Non-adjacent correspondences (used only for error measurement)
    // are left as the raw RANSAC inlier set.
    for window in order.windows(2) {
        let (a, b) = (window[0], window[1]);
        let (i, j) = (a.min(b), a.max(b));
        let Some(PairResult { inliers, fit }) = &results[i][j] else { continue };
        let src_all: Vec<[f64; 2]> = feature_sets[i].keypoints.iter().map(|p| [p[0] as f64, p[1] as f64]).collect();
        let dst_all: Vec<[f64; 2]> = feature_sets[j].keypoints.iter().map(|p| [p[0] as f64, p[1] as f64]).collect();
        let refined = serireg_features::neighbor_refine::refine_with_fit(inliers, &src_all, &dst_all, fit, config.detector.ransac_inlier_threshold_px);
        let src_pts: Vec<[f64; 2]> = refined.iter().map(|m| src_all[m.i]).collect();
        let dst_pts: Vec<[f64; 2]> = refined.iter().map(|m| dst_all[m.j]).collect();
        correspondences.insert((i, j), PairCorrespondence { moving: i, fixed: j, src_pts: src_pts.clone(), dst_pts: dst_pts.clone() });
        correspondences.insert((j, i), PairCorrespondence { moving: j, fixed: i, src_pts: dst_pts, dst_pts: src_pts });
    }

    let reference_pos = config.reference.map(|native| stack_idx[native]).unwrap_or(0);
    let rigid_cfg = FullRigidConfig {
        start_class: TransformClass::Similarity,
        inlier_threshold_px: config.detector.ransac_inlier_threshold_px,
        min_inliers: serireg_features::MIN_INLIER_MATCHES,
        check_reflections: config.detector.check_reflections,
    };

    // C5: rigid chain fit + canonical placement.
    let fits: IndexMap<usize, SlideFit> = match fit_full_rigid_chain(&order, reference_pos, &correspondences, &rigid_cfg) {
        Ok(fits) => fits,
        Err(e) => return Err(Report { errors: vec![e.into()] }),
    };
    let native_shapes: IndexMap<usize, ShapeRc> = staged.iter().map(|s| (s.id, s.proc_shape)).collect();
    let placement = place_in_canonical_frame(&fits, &native_shapes);
    let reg_shape = placement.reg_shape;
    let reference_idx = order[reference_pos];

    info!(?order, reference = reference_idx, reg_shape = ?reg_shape, "rigid registration placed into canonical frame");

    // Warp every processed/normalized image and mask into the canonical frame.
    let transforms: IndexMap<usize, serireg_warp::SlideTransform> = staged
        .iter()
        .map(|s| {
            let t = serireg_warp::SlideTransform { native_shape: s.proc_shape, proc_shape: s.proc_shape, rigid_m: placement.matrices[&s.id], canonical_shape: reg_shape, fwd_dxdy: None, bk_dxdy: None };
            (s.id, t)
        })
        .collect();

    let warped_images: IndexMap<usize, Array2<u8>> = staged
        .iter()
        .map(|s| {
            let normalized_img = gray_to_rgb3(&normalized[s.id]);
            let warped = serireg_warp::warp_image_to_canonical(&normalized_img, &transforms[&s.id], None, &[0], serireg_warp::Interp::Bilinear);
            (s.id, Array2::from_shape_fn((reg_shape.0, reg_shape.1), |(r, c)| warped[[0, r, c]]))
        })
        .collect();
    let warped_masks: IndexMap<usize, Array2<u8>> = staged
        .iter()
        .map(|s| {
            let mask3 = gray_to_rgb3(&s.mask);
            let warped = serireg_warp::warp_image_to_canonical(&mask3, &transforms[&s.id], None, &[0], serireg_warp::Interp::Nearest);
            (s.id, Array2::from_shape_fn((reg_shape.0, reg_shape.1), |(r, c)| warped[[0, r, c]]))
        })
        .collect();

    for (id, img) in &warped_images {
        if let Err(e) = write_grayscale_png(&layout.rigid_registration().join(format!("{id}.png")), img) {
            errors.push(e);
        }
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }

    let ordered_mask_list: Vec<Array2<u8>> = order.iter().map(|id| warped_masks[id].clone()).collect();
    let (set_crop_mask, crop_bbox) = crop_mask_for(config.crop_mode, &ordered_mask_list, &warped_masks[&reference_idx]);
    let _ = crop_bbox;

    // C6: non-rigid composition against the tissue-union mask.
    let (nr_mask, _) = nr_bbox(&ordered_mask_list, &warped_masks[&reference_idx]);
    let solver = build_solver(config.non_rigid.solver);
    let outcome = match config.non_rigid.composition {
        CompositionStrategy::SerialCompose => serial_compose(&order, reference_pos, &warped_images, &nr_mask, solver.as_ref(), reg_shape, config.non_rigid.compose),
        CompositionStrategy::AlignToReference => align_to_reference(&order, reference_pos, &warped_images, &nr_mask, solver.as_ref(), reg_shape),
    };
    for w in outcome.warnings {
        warn!(pair = ?w.pair, "non-rigid solver failed for pair, falling back to identity field");
        warnings.push(w.into());
    }
    let mut fields = outcome.fields;

    // C7: optional micro-registration, tiled when the in-memory field would
    // exceed the configured budget.
    if config.non_rigid.micro_registration {
        for &id in &order {
            if id == reference_idx {
                continue;
            }
            let existing = fields[&id].fwd.clone();
            let fixed = &warped_images[&reference_idx];
            let moving = &warped_images[&id];
            let budget_check = check_memory_budget(reg_shape, 1, config.non_rigid.micro_memory_threshold_bytes);
            let update = if budget_check.is_ok() {
                match solver.solve(fixed, moving, Some(&nr_mask)) {
                    Ok(paired) => paired.fwd,
                    Err(source) => {
                        warnings.push(Warning::from(serireg_nonrigid::SolverFailed { pair: (id, reference_idx), source }));
                        DisplacementField::zeros(reg_shape)
                    }
                }
            } else {
                warnings.push(budget_check.unwrap_err().into());
                let tiles = tile_grid(reg_shape, config.non_rigid.micro_tile_size, config.non_rigid.micro_tile_overlap);
                let mut tile_fields = Vec::with_capacity(tiles.len());
                for bbox in tiles {
                    let fixed_tile = serireg_nonrigid::crop_to_bbox(fixed, bbox);
                    let moving_tile = serireg_nonrigid::crop_to_bbox(moving, bbox);
                    let mask_tile = serireg_nonrigid::crop_to_bbox(&nr_mask, bbox);
                    match solver.solve(&fixed_tile, &moving_tile, Some(&mask_tile)) {
                        Ok(paired) => tile_fields.push((bbox, paired.fwd)),
                        Err(source) => {
                            warnings.push(Warning::from(serireg_nonrigid::SolverFailed { pair: (id, reference_idx), source }));
                            tile_fields.push((bbox, DisplacementField::zeros((bbox.h as usize, bbox.w as usize))));
                        }
                    }
                }
                stitch_tiles(&tile_fields, reg_shape)
            };
            match apply_micro_update(&existing, &update, reg_shape) {
                Ok(refined) => {
                    let entry = fields.get_mut(&id).expect("field exists for every non-reference slide");
                    entry.fwd = refined;
                }
                Err(e) => errors.push(e),
            }
        }
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }

    for (id, paired) in &fields {
        let preview_path = layout.non_rigid_registration().join(format!("{id}.png"));
        let before = &warped_images[id];
        let sampled = Array2::from_shape_fn(reg_shape, |(r, c)| {
            let d = paired.fwd.sample(c as f64, r as f64);
            let (sx, sy) = (c as f64 + d[0] as f64, r as f64 + d[1] as f64);
            if sx < 0.0 || sy < 0.0 || sx as usize >= reg_shape.1 || sy as usize >= reg_shape.0 {
                0
            } else {
                before[[sy as usize, sx as usize]]
            }
        });
        if let Err(e) = write_overlap_preview(&preview_path, before, &sampled) {
            errors.push(e);
        }
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }

    // §4.8 error measurement: mean keypoint displacement at each stage,
    // scaled to a relative TRE against the reference frame's diagonal.
    let mut summary_rows = Vec::with_capacity(staged.len());
    for &id in &order {
        if id == reference_idx {
            continue;
        }
        let correspondence = correspondences.get(&(id, reference_idx));
        let (original_d, rigid_d, non_rigid_d) = match correspondence {
            Some(c) if !c.src_pts.is_empty() => {
                let n = c.src_pts.len() as f64;
                let original: f64 = c.src_pts.iter().zip(&c.dst_pts).map(|(a, b)| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()).sum::<f64>() / n;
                let rigid_pts: Vec<[f64; 2]> = c.src_pts.iter().map(|&p| placement.matrices[&id].apply(p)).collect();
                let fixed_pts: Vec<[f64; 2]> = c.dst_pts.iter().map(|&p| placement.matrices[&reference_idx].apply(p)).collect();
                let rigid: f64 = rigid_pts.iter().zip(&fixed_pts).map(|(a, b)| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()).sum::<f64>() / n;
                let nr_pts: Vec<[f64; 2]> = rigid_pts
                    .iter()
                    .map(|&p| {
                        let d = fields[&id].fwd.sample(p[0], p[1]);
                        [p[0] + d[0] as f64, p[1] + d[1] as f64]
                    })
                    .collect();
                let non_rigid: f64 = nr_pts.iter().zip(&fixed_pts).map(|(a, b)| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()).sum::<f64>() / n;
                (original, rigid, non_rigid)
            }
            _ => (0.0, 0.0, 0.0),
        };
        summary_rows.push(SummaryRow {
            filename: format!("{id}"),
            from: id,
            to: reference_idx,
            original_d,
            original_rtre: rtre(original_d, reg_shape),
            rigid_d,
            rigid_rtre: rtre(rigid_d, reg_shape),
            non_rigid_d,
            non_rigid_rtre: rtre(non_rigid_d, reg_shape),
            processed_img_shape: format!("{:?}", staged[id].proc_shape),
            shape: format!("{:?}", reg_shape),
            aligned_shape: format!("{:?}", reg_shape),
            mean_original_d: original_d,
            mean_rigid_d: rigid_d,
            mean_non_rigid_d: non_rigid_d,
            physical_units: "micron".into(),
            resolution: 1.0,
            name: format!("slide-{id}"),
            rigid_time_minutes: 0.0,
            non_rigid_time_minutes: 0.0,
        });
    }
    let summary_csv_path = layout.data().join("summary.csv");
    if let Err(e) = write_summary_csv(&summary_csv_path, &summary_rows) {
        return Err(Report { errors: vec![e] });
    }

    // Spill every displacement field and assemble the set artifact.
    let mut slide_records = Vec::with_capacity(staged.len());
    for s in &staged {
        let id = s.id;
        let fixed_neighbor = {
            let pos = stack_idx[id];
            if id == reference_idx {
                None
            } else if pos > reference_pos {
                Some(order[pos - 1])
            } else {
                Some(order[pos + 1])
            }
        };
        let (bk_path, fwd_path) = if let Some(paired) = fields.get(&id) {
            let bk_rel = PathBuf::from("data").join("displacements").join(format!("{id}_bk.srdf"));
            let fwd_rel = PathBuf::from("data").join("displacements").join(format!("{id}_fwd.srdf"));
            spill(&config.output_dir.join(&bk_rel), &paired.bk, &mut errors);
            spill(&config.output_dir.join(&fwd_rel), &paired.fwd, &mut errors);
            (Some(bk_rel), Some(fwd_rel))
        } else {
            (None, None)
        };
        slide_records.push(SlideRecord {
            src: slides[id].path.to_string_lossy().into_owned(),
            stack_idx: stack_idx[id],
            fixed_neighbor,
            shape_proc: s.proc_shape,
            rigid_m: placement.matrices[&id],
            image_thumb_path: Some(PathBuf::from("rigid_registration").join(format!("{id}.png"))),
            mask_thumb_path: Some(PathBuf::from("masks").join(format!("{id}.png"))),
            bk_dxdy_path: bk_path,
            fwd_dxdy_path: fwd_path,
        });
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }
    let crop_mask_rel = PathBuf::from("overlaps").join("crop_mask.png");
    if let Err(e) = write_grayscale_png(&config.output_dir.join(&crop_mask_rel), &set_crop_mask) {
        return Err(Report { errors: vec![e] });
    }

    let mut artifact = SetArtifact::new(slide_records, reference_idx, reg_shape, config.crop_mode, Some(target_stats), vec![solver.name().to_string()]);
    artifact.crop_mask_path = Some(crop_mask_rel);
    let artifact_path = config.output_dir.join("run.set.json");
    if let Err(e) = artifact.write_to(&artifact_path) {
        return Err(Report { errors: vec![e] });
    }

    for (&id, paired) in &fields {
        let path = layout.deformation_fields().join(format!("{id}.png"));
        if let Err(e) = write_deformation_grid_preview(&path, reg_shape, 32, |x, y| paired.fwd.sample(x, y)) {
            errors.push(e);
        }
    }
    if !errors.is_empty() {
        return Err(Report { errors });
    }

    info!(artifact = %artifact_path.display(), "registration run complete");
    Ok((RunOutcome { artifact_path, summary_csv_path, reg_shape, reference_idx }, warnings))
}

fn spill(path: &Path, field: &DisplacementField, errors: &mut Vec<anyhow::Error>) {
    match std::fs::File::create(path) {
        Ok(mut file) => {
            if let Err(e) = serireg_nonrigid::write_srdf(&mut file, field) {
                errors.push(e);
            }
        }
        Err(e) => errors.push(e.into()),
    }
}

/// C8's `Warp` subcommand: move a single point from one registered slide's
/// native frame into another's, via the persisted set artifact.
pub fn warp_point(artifact: &SetArtifact, from: usize, to: usize, xy: [f64; 2]) -> Result<[f64; 2]> {
    let from_record = artifact.slides.get(from).with_context(|| format!("no slide {from} in artifact"))?;
    let to_record = artifact.slides.get(to).with_context(|| format!("no slide {to} in artifact"))?;
    let load_field = |path: &Option<PathBuf>| -> Result<Option<DisplacementField>> {
        match path {
            Some(p) => {
                let mut file = std::fs::File::open(p).with_context(|| format!("opening {}", p.display()))?;
                Ok(Some(serireg_nonrigid::read_srdf(&mut file)?))
            }
            None => Ok(None),
        }
    };
    let from_chain = serireg_warp::SlideTransform {
        native_shape: from_record.shape_proc,
        proc_shape: from_record.shape_proc,
        rigid_m: from_record.rigid_m,
        canonical_shape: artifact.reg_shape,
        fwd_dxdy: load_field(&from_record.fwd_dxdy_path)?,
        bk_dxdy: load_field(&from_record.bk_dxdy_path)?,
    };
    let to_chain = serireg_warp::SlideTransform {
        native_shape: to_record.shape_proc,
        proc_shape: to_record.shape_proc,
        rigid_m: to_record.rigid_m,
        canonical_shape: artifact.reg_shape,
        fwd_dxdy: load_field(&to_record.fwd_dxdy_path)?,
        bk_dxdy: load_field(&to_record.bk_dxdy_path)?,
    };
    from_chain.warp_to(&to_chain, xy)
}

/// C8's `Info` subcommand: a human-readable summary of a persisted run.
pub fn describe(artifact: &SetArtifact) -> String {
    format!(
        "{} slides, reference={}, reg_shape={:?}, crop_mode={:?}, solvers={:?}",
        artifact.slides.len(),
        artifact.reference_idx,
        artifact.reg_shape,
        artifact.crop_mode,
        artifact.solver_names
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_seed_is_deterministic_and_varies_with_counter() {
        let a = derive_seed(7, 3);
        let b = derive_seed(7, 3);
        assert_eq!(a, b);
        assert_ne!(derive_seed(7, 3), derive_seed(7, 4));
        assert_ne!(derive_seed(7, 0), derive_seed(8, 0));
    }

    #[test]
    fn crop_mask_for_dispatches_by_mode() {
        let masks = vec![Array2::from_elem((8, 8), 255u8)];
        let reference = Array2::from_elem((8, 8), 255u8);
        let (none_mask, none_bbox) = crop_mask_for(serireg_warp::CropMode::None, &masks, &reference);
        assert!(none_mask.iter().all(|&v| v == 255));
        assert_eq!((none_bbox.w, none_bbox.h), (8, 8));

        let (reference_mask, _) = crop_mask_for(serireg_warp::CropMode::Reference, &masks, &reference);
        assert_eq!(reference_mask, reference);

        let (overlap_mask, _) = crop_mask_for(serireg_warp::CropMode::Overlap, &masks, &reference);
        assert_eq!(overlap_mask.dim(), reference.dim());
    }

    #[test]
    fn gray_to_rgb3_preserves_pixel_values_on_the_single_channel() {
        let img = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as u8);
        let packed = gray_to_rgb3(&img);
        assert_eq!(packed.dim(), (1, 4, 5));
        for r in 0..4 {
            for c in 0..5 {
                assert_eq!(packed[[0, r, c]], img[[r, c]]);
            }
        }
    }
}
