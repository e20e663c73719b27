//! The PEARL ERC-20 utility token.
//!
//! A plain 18-decimal fungible token: the full supply is minted to the
//! deployer, who then funds the exchange and any other platform contracts.
//! Further minting is owner-only; anyone may burn their own tokens.

// Only run this as a WASM if the export-abi feature is not set.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use stylus_sdk::prelude::*;

pub const NAME: &str = "Pearl";
pub const SYMBOL: &str = "PEARL";
pub const DECIMALS: u8 = 18;

sol_storage! {
    #[entrypoint]
    pub struct PearlToken {
        /// Maps users to balances
        mapping(address => uint256) balances;
        /// Maps users to a mapping of each spender's allowance
        mapping(address => mapping(address => uint256)) allowances;
        /// The total supply of the token
        uint256 total_supply;
        /// Only account allowed to mint
        address owner;
    }
}

// Declare events and Solidity error types
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
    event Approval(address indexed owner, address indexed spender, uint256 value);

    #[derive(Debug)]
    error InsufficientBalance(address from, uint256 have, uint256 want);

    #[derive(Debug)]
    error InsufficientAllowance(address owner, address spender, uint256 have, uint256 want);

    #[derive(Debug)]
    error Unauthorized(address caller);

    #[derive(Debug)]
    error Overflow();
}

/// Represents the ways methods may fail.
#[derive(SolidityError, Debug)]
pub enum PearlTokenError {
    InsufficientBalance(InsufficientBalance),
    InsufficientAllowance(InsufficientAllowance),
    Unauthorized(Unauthorized),
    Overflow(Overflow),
}

impl PearlToken {
    /// Movement of funds between 2 accounts
    /// (invoked by the external transfer() and transfer_from() functions)
    fn do_transfer(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<(), PearlTokenError> {
        let mut sender_balance = self.balances.setter(from);
        let old_sender_balance = sender_balance.get();
        if old_sender_balance < value {
            return Err(PearlTokenError::InsufficientBalance(InsufficientBalance {
                from,
                have: old_sender_balance,
                want: value,
            }));
        }
        sender_balance.set(old_sender_balance - value);

        let mut to_balance = self.balances.setter(to);
        let new_to_balance = to_balance.get() + value;
        to_balance.set(new_to_balance);

        self.vm().log(Transfer { from, to, value });
        Ok(())
    }

    fn do_mint(&mut self, to: Address, value: U256) -> Result<(), PearlTokenError> {
        let supply = self
            .total_supply
            .get()
            .checked_add(value)
            .ok_or(PearlTokenError::Overflow(Overflow {}))?;
        self.total_supply.set(supply);

        let mut balance = self.balances.setter(to);
        let new_balance = balance.get() + value;
        balance.set(new_balance);

        self.vm().log(Transfer {
                from: Address::ZERO,
                to,
                value,
            },
        );
        Ok(())
    }
}

#[public]
impl PearlToken {
    #[constructor]
    pub fn constructor(&mut self, initial_supply: U256) {
        // Use tx_origin instead of msg_sender because deployment goes through a factory.
        let deployer = self.vm().tx_origin();
        self.owner.set(deployer);
        // Mint cannot overflow from a zero supply.
        let _ = self.do_mint(deployer, initial_supply);
    }

    /// Immutable token name
    pub fn name(&self) -> String {
        NAME.into()
    }

    /// Immutable token symbol
    pub fn symbol(&self) -> String {
        SYMBOL.into()
    }

    /// Immutable token decimals
    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    /// Total supply of tokens
    pub fn total_supply(&self) -> U256 {
        self.total_supply.get()
    }

    /// Balance of `address`
    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(owner)
    }

    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    /// Transfers `value` tokens from the caller to `to`
    pub fn transfer(&mut self, to: Address, value: U256) -> Result<bool, PearlTokenError> {
        let from = self.vm().msg_sender();
        self.do_transfer(from, to, value)?;
        Ok(true)
    }

    /// Transfers `value` tokens from `from` to `to`
    /// (the caller must be able to spend at least `value` tokens from `from`)
    pub fn transfer_from(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<bool, PearlTokenError> {
        let spender = self.vm().msg_sender();
        let mut sender_allowances = self.allowances.setter(from);
        let mut allowance = sender_allowances.setter(spender);
        let old_allowance = allowance.get();
        if old_allowance < value {
            return Err(PearlTokenError::InsufficientAllowance(
                InsufficientAllowance {
                    owner: from,
                    spender,
                    have: old_allowance,
                    want: value,
                },
            ));
        }
        allowance.set(old_allowance - value);

        self.do_transfer(from, to, value)?;
        Ok(true)
    }

    /// Approves the spenditure of `value` tokens of the caller to `spender`
    pub fn approve(&mut self, spender: Address, value: U256) -> bool {
        let owner = self.vm().msg_sender();
        self.allowances.setter(owner).insert(spender, value);
        self.vm().log(Approval {
                owner,
                spender,
                value,
            },
        );
        true
    }

    /// Returns the allowance of `spender` on `owner`'s tokens
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.getter(owner).get(spender)
    }

    /// Mints `value` tokens to `to`. Owner-only.
    pub fn mint_to(&mut self, to: Address, value: U256) -> Result<(), PearlTokenError> {
        let caller = self.vm().msg_sender();
        if caller != self.owner.get() {
            return Err(PearlTokenError::Unauthorized(Unauthorized { caller }));
        }
        self.do_mint(to, value)
    }

    /// Burns `value` of the caller's tokens
    pub fn burn(&mut self, value: U256) -> Result<(), PearlTokenError> {
        let from = self.vm().msg_sender();
        let mut balance = self.balances.setter(from);
        let old_balance = balance.get();
        if old_balance < value {
            return Err(PearlTokenError::InsufficientBalance(InsufficientBalance {
                from,
                have: old_balance,
                want: value,
            }));
        }
        balance.set(old_balance - value);
        self.total_supply.set(self.total_supply.get() - value);

        self.vm().log(Transfer {
                from,
                to: Address::ZERO,
                value,
            },
        );
        Ok(())
    }
}
