use crate::distribution::OutcomeSampler;
use crate::frequency::FrequencyTable;
use rand::Rng;

/// Outcome of drawing one animation frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameDraw {
    pub recorded: u64,
    pub discarded: u64,
}

/// Draw `count` outcomes and add them to `table`.
pub(crate) fn draw_frame<R: Rng + ?Sized>(
    sampler: &OutcomeSampler,
    rng: &mut R,
    table: &mut FrequencyTable,
    count: u64,
) -> FrameDraw {
    let mut out = FrameDraw::default();
    for _ in 0..count {
        if table.record(sampler.sample(rng)) {
            out.recorded += 1;
        } else {
            out.discarded += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_draw_is_accounted_for() {
        // A narrow table forces plenty of discards.
        let spec = DistributionSpec::Poisson {
            lambda: 5.0,
            bins: 4,
        };
        let sampler = spec.sampler().unwrap();
        let mut table = FrequencyTable::new(0, spec.bins());
        let mut rng = StdRng::seed_from_u64(3);

        let d = draw_frame(&sampler, &mut rng, &mut table, 1_000);
        assert_eq!(d.recorded + d.discarded, 1_000);
        assert_eq!(table.total(), d.recorded);
        assert_eq!(table.discarded, d.discarded);
        assert!(d.discarded > 0);
    }

    #[test]
    fn zero_count_draws_nothing() {
        let sampler = DistributionSpec::DEFAULT_BINOMIAL.sampler().unwrap();
        let mut table = FrequencyTable::new(0, 26);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            draw_frame(&sampler, &mut rng, &mut table, 0),
            FrameDraw::default()
        );
    }
}
