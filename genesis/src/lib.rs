//! Genesis state construction and config-directory loading.
//!
//! A config directory holds three YAML files: `config.yaml` with the
//! genesis time and the validator set (explicit pubkeys or a count to
//! derive them from), `validators.yaml` assigning validator indices to
//! node names, and `nodes.yaml` with one ENR string per node. ENRs are
//! opaque here; the transport owns their interpretation.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pqsig::PublicKeyBytes;
use types::{
    containers::ChainConfig,
    primitives::{UnixSeconds, ValidatorIndex},
    state::State,
};

pub const CONFIG_FILE: &str = "config.yaml";
pub const VALIDATORS_FILE: &str = "validators.yaml";
pub const NODES_FILE: &str = "nodes.yaml";

#[derive(Debug, Error)]
pub enum Error {
    #[error("config.yaml must define either genesis_validators or VALIDATOR_COUNT")]
    NoValidatorSource,
    #[error("the genesis validator set is empty")]
    EmptyValidatorSet,
    #[error("node {node_name:?} is not present in validators.yaml")]
    UnknownNode { node_name: String },
}

/// The raw contents of `config.yaml`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisConfig {
    #[serde(rename = "GENESIS_TIME")]
    pub genesis_time: UnixSeconds,
    /// Pubkeys are derived deterministically from this count when no
    /// explicit list is given.
    #[serde(rename = "VALIDATOR_COUNT", default, skip_serializing_if = "Option::is_none")]
    pub validator_count: Option<u64>,
    /// Hex-encoded 52-byte pubkeys. Wins over `VALIDATOR_COUNT` when both
    /// are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_validators: Option<Vec<PublicKeyBytes>>,
}

impl GenesisConfig {
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let path = config_dir.as_ref().join(CONFIG_FILE);
        let contents = fs_err::read_to_string(&path)?;

        serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {path:?}"))
    }

    pub fn into_spec(self) -> Result<GenesisSpec> {
        let validator_pubkeys = match (self.genesis_validators, self.validator_count) {
            (Some(pubkeys), _) => pubkeys,
            (None, Some(count)) => (0..count)
                .map(|index| pqsig::devnet::public_key(index).map_err(Into::into))
                .collect::<Result<_>>()?,
            (None, None) => return Err(Error::NoValidatorSource.into()),
        };

        if validator_pubkeys.is_empty() {
            return Err(Error::EmptyValidatorSet.into());
        }

        Ok(GenesisSpec {
            genesis_time: self.genesis_time,
            validator_pubkeys,
        })
    }
}

/// A fully resolved genesis: the time and the ordered validator set.
#[derive(Clone, Debug)]
pub struct GenesisSpec {
    pub genesis_time: UnixSeconds,
    pub validator_pubkeys: Vec<PublicKeyBytes>,
}

impl GenesisSpec {
    #[must_use]
    pub fn num_validators(&self) -> u64 {
        self.validator_pubkeys.len() as u64
    }

    /// The state every node starts from. Collections are empty and the
    /// checkpoints carry the zero root placeholder; the first block fills
    /// in the genesis block root.
    #[must_use]
    pub fn state(&self) -> State {
        State {
            config: ChainConfig {
                num_validators: self.num_validators(),
                genesis_time: self.genesis_time,
            },
            ..State::default()
        }
    }
}

/// Loads `validators.yaml`: node name → validator indices.
pub fn load_validator_assignments(
    config_dir: impl AsRef<Path>,
) -> Result<BTreeMap<String, Vec<ValidatorIndex>>> {
    let path = config_dir.as_ref().join(VALIDATORS_FILE);
    let contents = fs_err::read_to_string(&path)?;

    serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {path:?}"))
}

/// The validator indices a node is responsible for.
pub fn own_validators(
    assignments: &BTreeMap<String, Vec<ValidatorIndex>>,
    node_name: &str,
) -> Result<Vec<ValidatorIndex>> {
    assignments
        .get(node_name)
        .cloned()
        .ok_or_else(|| {
            Error::UnknownNode {
                node_name: node_name.to_owned(),
            }
            .into()
        })
}

/// Loads `nodes.yaml`: an ordered list of ENR strings, where the array
/// index is the node ID.
pub fn load_bootnodes(config_dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = config_dir.as_ref().join(NODES_FILE);
    let contents = fs_err::read_to_string(&path)?;

    serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {path:?}"))
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;
    use hex_literal::hex;
    use ssz::SszHash as _;

    use super::*;

    #[test]
    fn explicit_validators_win_over_the_count() -> Result<()> {
        let pubkey = pqsig::devnet::public_key(7)?;

        let config = GenesisConfig {
            genesis_time: 1,
            validator_count: Some(5),
            genesis_validators: Some(vec![pubkey]),
        };

        let spec = config.into_spec()?;

        assert_eq!(spec.num_validators(), 1);
        assert_eq!(spec.validator_pubkeys, [pubkey]);

        Ok(())
    }

    #[test]
    fn a_count_derives_deterministic_pubkeys() -> Result<()> {
        let config = GenesisConfig {
            genesis_time: 0,
            validator_count: Some(2),
            genesis_validators: None,
        };

        let spec = config.into_spec()?;

        assert_eq!(spec.num_validators(), 2);
        assert_eq!(spec.validator_pubkeys[0], pqsig::devnet::public_key(0)?);
        assert_eq!(spec.validator_pubkeys[1], pqsig::devnet::public_key(1)?);

        Ok(())
    }

    #[test]
    fn a_config_without_validators_is_rejected() {
        let config = GenesisConfig {
            genesis_time: 0,
            validator_count: None,
            genesis_validators: None,
        };

        assert!(config.into_spec().is_err());
    }

    #[test]
    fn config_yaml_round_trips() -> Result<()> {
        let yaml = "GENESIS_TIME: 1700000000\nVALIDATOR_COUNT: 3\n";
        let config: GenesisConfig = serde_yaml::from_str(yaml)?;

        assert_eq!(config.genesis_time, 1_700_000_000);
        assert_eq!(config.validator_count, Some(3));
        assert_eq!(config.genesis_validators, None);

        Ok(())
    }

    #[test]
    fn validator_assignments_parse_and_resolve() -> Result<()> {
        let assignments: BTreeMap<String, Vec<ValidatorIndex>> =
            serde_yaml::from_str("node_0: [0]\nnode_1: [1, 2]\n")?;

        assert_eq!(own_validators(&assignments, "node_1")?, [1, 2]);
        assert!(own_validators(&assignments, "node_9").is_err());

        Ok(())
    }

    #[test]
    fn the_two_validator_genesis_state_matches_the_reference_root() {
        let spec = GenesisSpec {
            genesis_time: 0,
            validator_pubkeys: vec![PublicKeyBytes::default(), PublicKeyBytes::default()],
        };

        assert_eq!(
            spec.state().hash_tree_root(),
            H256(hex!(
                "b070ac56f6a7b3f352293d013f5f8bdf133fa8396de141cff82d6c23adda2af3"
            )),
        );
    }

    #[test]
    fn files_load_from_a_config_directory() -> Result<()> {
        let directory = tempfile::TempDir::new()?;

        fs_err::write(
            directory.path().join(CONFIG_FILE),
            "GENESIS_TIME: 12\nVALIDATOR_COUNT: 2\n",
        )?;
        fs_err::write(directory.path().join(VALIDATORS_FILE), "node_0: [0, 1]\n")?;
        fs_err::write(directory.path().join(NODES_FILE), "- enr:-one\n- enr:-two\n")?;

        let config = GenesisConfig::load(directory.path())?;
        assert_eq!(config.genesis_time, 12);

        let assignments = load_validator_assignments(directory.path())?;
        assert_eq!(own_validators(&assignments, "node_0")?, [0, 1]);

        let bootnodes = load_bootnodes(directory.path())?;
        assert_eq!(bootnodes, ["enr:-one", "enr:-two"]);

        Ok(())
    }
}
