//! Meme voting contest.
//!
//! Anyone may submit a meme (an IPFS hash plus its Story Protocol IP id) and
//! vote for submitted memes, one vote per address per meme. The contest
//! results are just the entry with the most votes so far; there are no
//! rounds, deadlines, or prizes on chain.

// Only run this as a WASM if the export-abi feature is not set.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use stylus_sdk::prelude::*;

sol_storage! {
    pub struct MemeEntry {
        address creator;
        string ipfs_hash;
        string story_ip_id;
        uint256 votes;
    }

    #[entrypoint]
    pub struct MemeContest {
        MemeEntry[] memes;
        /// Per-meme record of who already voted
        mapping(uint256 => mapping(address => bool)) has_voted;
    }
}

sol! {
    #[derive(Debug, AbiType)]
    struct Meme {
        uint256 id;
        address creator;
        string ipfs_hash;
        string story_ip_id;
        uint256 votes;
    }

    event MemeSubmitted(uint256 indexed meme_id, address indexed creator, string ipfs_hash);
    event VoteCast(uint256 indexed meme_id, address indexed voter, uint256 votes);

    #[derive(Debug)]
    error EmptyIpfsHash();

    #[derive(Debug)]
    error InvalidMemeId(uint256 meme_id);

    #[derive(Debug)]
    error AlreadyVoted(uint256 meme_id, address voter);

    #[derive(Debug)]
    error NoMemes();
}

/// Represents the ways methods may fail.
#[derive(SolidityError, Debug)]
pub enum MemeContestError {
    EmptyIpfsHash(EmptyIpfsHash),
    InvalidMemeId(InvalidMemeId),
    AlreadyVoted(AlreadyVoted),
    NoMemes(NoMemes),
}

#[public]
impl MemeContest {
    /// Registers a meme and returns its id.
    pub fn submit_meme(
        &mut self,
        ipfs_hash: String,
        story_ip_id: String,
    ) -> Result<U256, MemeContestError> {
        if ipfs_hash.is_empty() {
            return Err(EmptyIpfsHash {}.into());
        }
        let creator = self.vm().msg_sender();
        let meme_id = U256::from(self.memes.len());

        let mut entry = self.memes.grow();
        entry.creator.set(creator);
        entry.ipfs_hash.set_str(&ipfs_hash);
        entry.story_ip_id.set_str(&story_ip_id);

        self.vm().log(MemeSubmitted {
                meme_id,
                creator,
                ipfs_hash,
            },
        );
        Ok(meme_id)
    }

    /// Casts the caller's vote for `meme_id`. One vote per address per meme.
    pub fn vote_for_meme(&mut self, meme_id: U256) -> Result<(), MemeContestError> {
        let index = usize::try_from(meme_id).map_err(|_| InvalidMemeId { meme_id })?;
        if index >= self.memes.len() {
            return Err(InvalidMemeId { meme_id }.into());
        }

        let voter = self.vm().msg_sender();
        if self.has_voted.getter(meme_id).get(voter) {
            return Err(AlreadyVoted { meme_id, voter }.into());
        }
        self.has_voted.setter(meme_id).insert(voter, true);

        // Index was bounds-checked above.
        let mut entry = self.memes.setter(index).unwrap();
        let votes = entry.votes.get() + U256::from(1);
        entry.votes.set(votes);

        self.vm().log(VoteCast {
                meme_id,
                voter,
                votes,
            },
        );
        Ok(())
    }

    /// Returns the current leader: (meme id, its votes, total entries).
    /// Ties go to the earliest submission.
    pub fn get_contest_results(&self) -> Result<(U256, U256, U256), MemeContestError> {
        let total = self.memes.len();
        if total == 0 {
            return Err(NoMemes {}.into());
        }

        let mut leading_id = 0usize;
        let mut leading_votes = U256::ZERO;
        for i in 0..total {
            // Index is within the length read above.
            let votes = self.memes.get(i).unwrap().votes.get();
            if votes > leading_votes {
                leading_id = i;
                leading_votes = votes;
            }
        }
        Ok((U256::from(leading_id), leading_votes, U256::from(total)))
    }

    pub fn meme_count(&self) -> U256 {
        U256::from(self.memes.len())
    }

    pub fn get_meme(&self, meme_id: U256) -> Result<Meme, MemeContestError> {
        let index = usize::try_from(meme_id).map_err(|_| InvalidMemeId { meme_id })?;
        let Some(entry) = self.memes.get(index) else {
            return Err(InvalidMemeId { meme_id }.into());
        };
        Ok(Meme {
            id: meme_id,
            creator: entry.creator.get(),
            ipfs_hash: entry.ipfs_hash.get_string(),
            story_ip_id: entry.story_ip_id.get_string(),
            votes: entry.votes.get(),
        })
    }

    pub fn has_voted(&self, meme_id: U256, voter: Address) -> bool {
        self.has_voted.getter(meme_id).get(voter)
    }
}
