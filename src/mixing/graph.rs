/*!
 * Declarative mix graph handed to the rendering engine.
 *
 * A graph is a list of named inputs and a list of filter chains. Chains are
 * laid out in a fixed order:
 *
 * 1. the silent base (`[base]`)
 * 2. per entry: the clip chain (`[clipN]`) and its merge into the running
 *    composite (`[mixN]`)
 * 3. optionally the bed chain (`[bed]`) and the weighted merge (`[out]`)
 *
 * The same plan always yields the same text, so two graphs can be compared
 * byte for byte or by fingerprint.
 */

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

use crate::mixing::timeline::{MixEntry, MixPlan, SOFT_COMPRESSOR};

/// Output codec of every render
pub const OUTPUT_CODEC: &str = "pcm_s16le";

/// `[in1][in2]filter1,filter2[out]`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<String>,
    pub output: String,
}

impl FilterChain {
    pub fn new(inputs: Vec<String>, filters: Vec<String>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            filters,
            output: output.into(),
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{}]", input)?;
        }
        write!(f, "{}[{}]", self.filters.join(","), self.output)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixGraph {
    /// Input files; chain labels refer to them as `N:a`
    pub inputs: Vec<PathBuf>,
    pub chains: Vec<FilterChain>,
    /// Label mapped to the output file
    pub output_label: String,
    pub sample_rate: u32,
    pub codec: String,
}

impl MixGraph {
    /// Lay out the graph for a plan
    pub fn from_plan(plan: &MixPlan) -> Self {
        let mut inputs = Vec::with_capacity(plan.entries.len() + 1);
        let mut chains = Vec::with_capacity(plan.entries.len() * 2 + 3);

        chains.push(FilterChain::new(
            Vec::new(),
            vec![format!(
                "aevalsrc=0:duration={}:sample_rate={}:channel_layout={}",
                plan.base_duration, plan.sample_rate, plan.channel_layout
            )],
            "base",
        ));

        let mut current = "base".to_string();
        for (position, entry) in plan.entries.iter().enumerate() {
            inputs.push(entry.clip_path.clone());

            let clip_label = format!("clip{}", position);
            chains.push(FilterChain::new(
                vec![format!("{}:a", position)],
                Self::clip_filters(entry, plan.channels),
                clip_label.clone(),
            ));

            let mix_label = format!("mix{}", position);
            chains.push(FilterChain::new(
                vec![current, clip_label],
                vec!["amix=inputs=2:duration=longest:normalize=0".to_string()],
                mix_label.clone(),
            ));
            current = mix_label;
        }

        if let Some(bed) = &plan.background {
            let bed_input = inputs.len();
            inputs.push(bed.path.clone());

            chains.push(FilterChain::new(
                vec![format!("{}:a", bed_input)],
                bed.bed_filters(),
                "bed",
            ));
            chains.push(FilterChain::new(
                vec![current, "bed".to_string()],
                vec![bed.merge_filter()],
                "out",
            ));
            current = "out".to_string();
        }

        Self {
            inputs,
            chains,
            output_label: current,
            sample_rate: plan.sample_rate,
            codec: OUTPUT_CODEC.to_string(),
        }
    }

    fn clip_filters(entry: &MixEntry, channels: u16) -> Vec<String> {
        let mut filters = vec![format!("volume={:.6}", entry.gain)];
        if entry.compress {
            filters.push(SOFT_COMPRESSOR.filter());
        }
        let delays = vec![entry.delay_ms.to_string(); channels.max(1) as usize];
        filters.push(format!("adelay={}", delays.join("|")));
        filters
    }

    /// The `-filter_complex` argument
    pub fn filter_complex(&self) -> String {
        self.chains
            .iter()
            .map(|chain| chain.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// SHA-256 over inputs, chains and output settings
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for input in &self.inputs {
            hasher.update(input.to_string_lossy().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.filter_complex().as_bytes());
        hasher.update(format!("|{}|{}|{}", self.output_label, self.codec, self.sample_rate).as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for MixGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.filter_complex())
    }
}
