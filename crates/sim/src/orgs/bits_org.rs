//! Organisms whose genome is a fixed-length bit sequence.

use super::{Encoding, TypedManager};
use crate::base::{BitVector, Random};
use crate::data::DataMap;
use crate::errors::{SetupError, StateError};
use crate::modules::SetupContext;
use crate::simulation::ConfigScope;

/// Settings shared by every bit-sequence organism of one manager.
#[derive(Debug, Clone, PartialEq)]
pub struct BitsOrgData {
    /// Number of bits in a new genome.
    pub init_length: usize,
    /// Per-site probability of a mutation trial.
    pub mut_prob: f64,
    /// Whether injected organisms start from random bits.
    pub init_random: bool,
    /// Name of the owned trait the genome is written to.
    pub output_name: String,
}

impl Default for BitsOrgData {
    fn default() -> Self {
        Self {
            init_length: 100,
            mut_prob: 0.01,
            init_random: true,
            output_name: "bits".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsOrg {
    bits: BitVector,
}

pub type BitsOrgManager = TypedManager<BitsOrg>;

impl BitsOrg {
    pub fn from_bits(bits: BitVector) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    pub fn bits_mut(&mut self) -> &mut BitVector {
        &mut self.bits
    }
}

impl Encoding for BitsOrg {
    type ManagerData = BitsOrgData;

    const TYPE_NAME: &'static str = "BitsOrg";
    const DESCRIPTION: &'static str = "Organism with a fixed-length bit-sequence genome";

    fn prototype(data: &BitsOrgData) -> Self {
        Self {
            bits: BitVector::new(data.init_length),
        }
    }

    fn setup_config(data: &mut BitsOrgData, config: &mut ConfigScope) {
        config.link_var(data, "init_length", "Number of bits in a new genome", |d| {
            &mut d.init_length
        });
        config.link_var(data, "mut_prob", "Per-site probability of a mutation trial", |d| {
            &mut d.mut_prob
        });
        config.link_var(data, "init_random", "Randomize bits of injected organisms", |d| {
            &mut d.init_random
        });
        config.link_var(data, "output_name", "Trait the bit sequence is written to", |d| {
            &mut d.output_name
        });
    }

    fn setup_traits(data: &BitsOrgData, ctx: &mut SetupContext<'_>) -> Result<(), SetupError> {
        if !(0.0..=1.0).contains(&data.mut_prob) {
            return Err(ctx.invalid_option("mut_prob", format!("{} is not a probability", data.mut_prob)));
        }
        ctx.owned_trait::<BitVector>(
            &data.output_name,
            "Bit sequence produced by the organism",
            BitVector::new(data.init_length),
        )?;
        Ok(())
    }

    fn randomize(&mut self, _data: &BitsOrgData, rng: &mut Random) {
        self.bits.randomize(rng);
    }

    fn initialize(&mut self, data: &BitsOrgData, rng: &mut Random) {
        if data.init_random {
            self.bits.randomize(rng);
        }
    }

    /// Draws the number of trials from Binomial(len, mut_prob); each trial
    /// picks a uniform site and sets it to a fair coin. Returns how many sites
    /// differ from before, so a site hit twice may count zero.
    fn mutate(&mut self, data: &BitsOrgData, rng: &mut Random) -> usize {
        let len = self.bits.len();
        let trials = rng.binomial(len, data.mut_prob);
        if trials == 0 {
            return 0;
        }
        let mut changed = BitVector::new(len);
        for _ in 0..trials {
            let pos = rng.get_uint(len);
            if rng.p(0.5) {
                self.bits.toggle(pos);
                changed.toggle(pos);
            }
        }
        changed.count_ones()
    }

    fn generate_output(&self, data: &BitsOrgData, map: &mut DataMap) -> Result<(), StateError> {
        map.set(&data.output_name, self.bits.clone())
    }

    fn describe(&self) -> String {
        self.bits.to_string()
    }
}
