//! PEARL-priced mystery boxes.
//!
//! A creator lists a box of hidden content (an IPFS hash plus its Story
//! Protocol IP id) at a PEARL price. Buying the box pays the creator directly
//! through the token's allowance mechanism and reveals the content to the
//! buyer, who may then convert it once into a Zora coin — the conversion here
//! only records the state transition and emits the event the off-chain
//! coining flow watches.
//!
//! Each box walks a one-way lifecycle: created, purchased (revealed),
//! converted.

// Only run this as a WASM if the export-abi feature is not set.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use stylus_sdk::{prelude::*, stylus_core::calls::Call};

sol_interface! {
    interface IERC20 {
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }
}

sol_storage! {
    pub struct BoxEntry {
        address creator;
        address owner;
        string content_type;
        string ipfs_hash;
        string story_ip_id;
        uint256 mint_price;
        bool purchased;
        bool converted;
    }

    #[entrypoint]
    pub struct MysteryBox {
        /// The PEARL ERC-20 used to pay for boxes.
        address pearl_token;
        BoxEntry[] boxes;
    }
}

sol! {
    #[derive(Debug, AbiType)]
    struct BoxView {
        uint256 id;
        address creator;
        address owner;
        string content_type;
        string ipfs_hash;
        string story_ip_id;
        uint256 mint_price;
        bool purchased;
        bool converted;
    }

    event BoxCreated(uint256 indexed box_id, address indexed creator, uint256 mint_price);
    event BoxPurchased(uint256 indexed box_id, address indexed buyer, uint256 mint_price);
    event BoxConverted(uint256 indexed box_id, address indexed owner);

    #[derive(Debug)]
    error EmptyIpfsHash();

    #[derive(Debug)]
    error ZeroPrice();

    #[derive(Debug)]
    error InvalidBoxId(uint256 box_id);

    #[derive(Debug)]
    error AlreadyPurchased(uint256 box_id);

    #[derive(Debug)]
    error NotPurchased(uint256 box_id);

    #[derive(Debug)]
    error AlreadyConverted(uint256 box_id);

    #[derive(Debug)]
    error NotBoxOwner(uint256 box_id, address caller);

    #[derive(Debug)]
    error TokenCallFailed();
}

/// Represents the ways methods may fail.
#[derive(SolidityError, Debug)]
pub enum MysteryBoxError {
    EmptyIpfsHash(EmptyIpfsHash),
    ZeroPrice(ZeroPrice),
    InvalidBoxId(InvalidBoxId),
    AlreadyPurchased(AlreadyPurchased),
    NotPurchased(NotPurchased),
    AlreadyConverted(AlreadyConverted),
    NotBoxOwner(NotBoxOwner),
    TokenCallFailed(TokenCallFailed),
}

impl MysteryBox {
    fn index_of(&self, box_id: U256) -> Result<usize, MysteryBoxError> {
        let index = usize::try_from(box_id).map_err(|_| InvalidBoxId { box_id })?;
        if index >= self.boxes.len() {
            return Err(InvalidBoxId { box_id }.into());
        }
        Ok(index)
    }
}

#[public]
impl MysteryBox {
    #[constructor]
    pub fn constructor(&mut self, pearl_token: Address) {
        self.pearl_token.set(pearl_token);
    }

    /// Lists a new box and returns its id. The content stays hidden until
    /// someone buys the box.
    pub fn create_mystery_box(
        &mut self,
        content_type: String,
        ipfs_hash: String,
        story_ip_id: String,
        mint_price: U256,
    ) -> Result<U256, MysteryBoxError> {
        if ipfs_hash.is_empty() {
            return Err(EmptyIpfsHash {}.into());
        }
        if mint_price.is_zero() {
            return Err(ZeroPrice {}.into());
        }

        let creator = self.vm().msg_sender();
        let box_id = U256::from(self.boxes.len());

        let mut entry = self.boxes.grow();
        entry.creator.set(creator);
        entry.owner.set(creator);
        entry.content_type.set_str(&content_type);
        entry.ipfs_hash.set_str(&ipfs_hash);
        entry.story_ip_id.set_str(&story_ip_id);
        entry.mint_price.set(mint_price);

        self.vm().log(BoxCreated {
                box_id,
                creator,
                mint_price,
            },
        );
        Ok(box_id)
    }

    /// Buys `box_id`, paying its PEARL price straight to the creator.
    /// The buyer must have approved this contract for at least the price.
    pub fn purchase_mystery_box(&mut self, box_id: U256) -> Result<(), MysteryBoxError> {
        let index = self.index_of(box_id)?;

        // Index was bounds-checked above.
        let entry = self.boxes.get(index).unwrap();
        if entry.purchased.get() {
            return Err(AlreadyPurchased { box_id }.into());
        }
        let creator = entry.creator.get();
        let mint_price = entry.mint_price.get();
        drop(entry);

        let buyer = self.vm().msg_sender();
        let token = IERC20::new(self.pearl_token.get());
        let context = Call::new_mutating(self);
        let paid = token
            .transfer_from(self.vm(), context, buyer, creator, mint_price)
            .map_err(|_| MysteryBoxError::TokenCallFailed(TokenCallFailed {}))?;
        if !paid {
            return Err(TokenCallFailed {}.into());
        }

        let mut entry = self.boxes.setter(index).unwrap();
        entry.owner.set(buyer);
        entry.purchased.set(true);

        self.vm().log(BoxPurchased {
                box_id,
                buyer,
                mint_price,
            },
        );
        Ok(())
    }

    /// Marks a revealed box as coined. Only the box owner, only once.
    pub fn convert_to_coin_v4(&mut self, box_id: U256) -> Result<(), MysteryBoxError> {
        let index = self.index_of(box_id)?;

        // Index was bounds-checked above.
        let entry = self.boxes.get(index).unwrap();
        if !entry.purchased.get() {
            return Err(NotPurchased { box_id }.into());
        }
        if entry.converted.get() {
            return Err(AlreadyConverted { box_id }.into());
        }
        let owner = entry.owner.get();
        drop(entry);

        let caller = self.vm().msg_sender();
        if caller != owner {
            return Err(NotBoxOwner { box_id, caller }.into());
        }

        let mut entry = self.boxes.setter(index).unwrap();
        entry.converted.set(true);

        self.vm().log(BoxConverted { box_id, owner });
        Ok(())
    }

    pub fn box_count(&self) -> U256 {
        U256::from(self.boxes.len())
    }

    pub fn get_box(&self, box_id: U256) -> Result<BoxView, MysteryBoxError> {
        let index = self.index_of(box_id)?;
        // Index was bounds-checked above.
        let entry = self.boxes.get(index).unwrap();
        Ok(BoxView {
            id: box_id,
            creator: entry.creator.get(),
            owner: entry.owner.get(),
            content_type: entry.content_type.get_string(),
            ipfs_hash: entry.ipfs_hash.get_string(),
            story_ip_id: entry.story_ip_id.get_string(),
            mint_price: entry.mint_price.get(),
            purchased: entry.purchased.get(),
            converted: entry.converted.get(),
        })
    }

    pub fn pearl_token(&self) -> Address {
        self.pearl_token.get()
    }
}
