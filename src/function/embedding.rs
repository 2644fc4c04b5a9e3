//! Embedding segment functions into global spaces
use crate::assembly::{CsrMatrix, SparseMatrixData};
use crate::function::{FunctionSpace, GridFunction};
use crate::solvers::LinearOperator;
use crate::types::{Error, Result};

/// The sparse identity operator mapping the dofs of a segment space onto the same dofs of a
/// larger space.
///
/// The matrix has one unit entry per column. Both spaces must share grid and element, the
/// segment space must not be truncated, and every dof of the segment space must be present in
/// the target.
pub fn embedding_matrix(segment: &FunctionSpace, global: &FunctionSpace) -> Result<CsrMatrix> {
    if !segment.is_compatible_with(global) {
        return Err(Error::IncompatibleSpaces(
            "embedding needs spaces with the same grid and element".into(),
        ));
    }
    if segment.is_truncated() && !std::ptr::eq(segment, global) {
        return Err(Error::IncompatibleSpaces(
            "basis functions truncated at the segment boundary are not in the target space"
                .into(),
        ));
    }
    let shape = [global.local_size(), segment.local_size()];
    let mut matrix = SparseMatrixData::new_known_size(shape, segment.local_size());
    for (dof, global_dof) in segment.global_dof_numbers().iter().enumerate() {
        let row = global.local_dof_index(*global_dof).ok_or_else(|| {
            Error::IncompatibleSpaces(format!("dof {global_dof} is missing from the target space"))
        })?;
        matrix.push(row, dof, 1.0);
    }
    matrix.to_csr()
}

/// Embed a function into a larger space
pub fn embed<'a>(fun: &GridFunction, global: &'a FunctionSpace<'a>) -> Result<GridFunction<'a>> {
    let matrix = embedding_matrix(fun.space(), global)?;
    let mut coefficients = vec![0.0; global.local_size()];
    matrix.apply(fun.coefficients(), &mut coefficients)?;
    GridFunction::from_coefficients(global, coefficients)
}

/// Sum the embeddings of functions on disjoint segment spaces into a single function.
///
/// It is an error for two of the parts to share a dof.
pub fn recombine<'a>(
    parts: &[&GridFunction],
    global: &'a FunctionSpace<'a>,
) -> Result<GridFunction<'a>> {
    let mut owner: Vec<Option<usize>> = vec![None; global.local_size()];
    let mut out = GridFunction::zero(global);
    for (index, part) in parts.iter().enumerate() {
        let embedded = embed(part, global)?;
        for dof in part.space().global_dof_numbers() {
            if let Some(row) = global.local_dof_index(*dof) {
                if let Some(previous) = owner[row].replace(index) {
                    return Err(Error::IncompatibleSpaces(format!(
                        "dof {dof} is shared by parts {previous} and {index}"
                    )));
                }
            }
        }
        out.axpy(1.0, &embedded)?;
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Continuity;
    use crate::function::SegmentOptions;
    use crate::shapes::cube;
    use rand::prelude::*;

    #[test]
    fn test_embedding_identity() {
        let grid = cube(0.5);
        let global = FunctionSpace::new(&grid, 2, Continuity::Continuous).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let coefficients = (0..global.local_size()).map(|_| rng.gen()).collect::<Vec<f64>>();
        let fun = GridFunction::from_coefficients(&global, coefficients.clone()).unwrap();
        let embedded = embed(&fun, &global).unwrap();
        assert_eq!(embedded.coefficients(), &coefficients[..]);
    }

    #[test]
    fn test_recombine() {
        let grid = cube(0.5);
        let global = FunctionSpace::new(&grid, 2, Continuity::Continuous).unwrap();
        let closed = FunctionSpace::on_segment(
            &grid,
            2,
            Continuity::Continuous,
            &[1, 3],
            SegmentOptions::closed(),
        )
        .unwrap();
        let open = FunctionSpace::on_segment(
            &grid,
            2,
            Continuity::Continuous,
            &[2, 4, 5, 6],
            SegmentOptions::open(),
        )
        .unwrap();
        let a = GridFunction::from_coefficients(&closed, vec![1.0; closed.local_size()]).unwrap();
        let b = GridFunction::from_coefficients(&open, vec![2.0; open.local_size()]).unwrap();
        let total = recombine(&[&a, &b], &global).unwrap();
        for (dof, value) in total.coefficients().iter().enumerate() {
            let expected = if closed.local_dof_index(global.global_dof_index(dof)).is_some() {
                1.0
            } else {
                2.0
            };
            assert_eq!(*value, expected);
        }
        assert!(matches!(
            recombine(&[&a, &a], &global),
            Err(Error::IncompatibleSpaces(_))
        ));
        // the open space misses the dofs of the Dirichlet faces
        assert!(embed(&total, &open).is_err());
    }

    #[test]
    fn test_incompatible() {
        let grid = cube(0.5);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let p2 = FunctionSpace::new(&grid, 2, Continuity::Continuous).unwrap();
        assert!(embedding_matrix(&p1, &p2).is_err());
        let strict = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed().strictly_on_segment(true),
        )
        .unwrap();
        assert!(embedding_matrix(&strict, &p1).is_err());
    }
}
