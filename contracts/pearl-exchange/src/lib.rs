//! Fixed-rate bidirectional ETH ⇄ PEARL exchange.
//!
//! The contract holds two reserves: its own ETH balance and a balance of the
//! PEARL ERC-20 token. Anyone may swap one for the other at the owner-set
//! `pearl_per_eth_rate`. The owner may adjust the rate, top up reserves, and
//! withdraw from them. Every failure is a full revert; there is no partial
//! trade state.

// Only run this as a WASM if the export-abi feature is not set.
#![cfg_attr(not(any(test, feature = "export-abi")), no_main)]
extern crate alloc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use stylus_sdk::{call::transfer::transfer_eth, prelude::*, stylus_core::calls::Call};

/// Wei per whole ETH. The rate is denominated in PEARL base-units per 1 ETH,
/// so both conversion formulas divide (or multiply) by this scale.
const ONE_ETH: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

sol_interface! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }
}

sol_storage! {
    #[entrypoint]
    pub struct PearlExchange {
        /// Only account allowed to change the rate or withdraw reserves.
        address owner;
        /// The PEARL ERC-20 contract being exchanged.
        address pearl_token;
        /// PEARL base-units paid out per 1 ETH (1000 PEARL/ETH is stored as 1000e18).
        uint256 pearl_per_eth_rate;
    }
}

// Declare events and Solidity error types
sol! {
    event EthExchangedForPearl(address indexed user, uint256 eth_in, uint256 pearl_out);
    event PearlExchangedForEth(address indexed user, uint256 pearl_in, uint256 eth_out);
    event ExchangeRateUpdated(uint256 old_rate, uint256 new_rate);
    event EthDeposited(address indexed from, uint256 amount);
    event EthWithdrawn(address indexed to, uint256 amount);
    event PearlWithdrawn(address indexed to, uint256 amount);
    event OwnershipTransferred(address indexed previous_owner, address indexed new_owner);

    #[derive(Debug)]
    error Unauthorized(address caller);

    #[derive(Debug)]
    error ZeroAmount();

    #[derive(Debug)]
    error ZeroRate();

    // The trade is so small that floor division rounds the output to nothing.
    #[derive(Debug)]
    error AmountTooSmall(uint256 amount);

    #[derive(Debug)]
    error Overflow();

    #[derive(Debug)]
    error ZeroAddress();

    #[derive(Debug)]
    error InsufficientPearlReserve(uint256 have, uint256 want);

    #[derive(Debug)]
    error InsufficientEthReserve(uint256 have, uint256 want);

    #[derive(Debug)]
    error TokenCallFailed();

    #[derive(Debug)]
    error EthTransferFailed();
}

/// Represents the ways methods may fail.
#[derive(SolidityError, Debug)]
pub enum PearlExchangeError {
    Unauthorized(Unauthorized),
    ZeroAmount(ZeroAmount),
    ZeroRate(ZeroRate),
    AmountTooSmall(AmountTooSmall),
    Overflow(Overflow),
    ZeroAddress(ZeroAddress),
    InsufficientPearlReserve(InsufficientPearlReserve),
    InsufficientEthReserve(InsufficientEthReserve),
    TokenCallFailed(TokenCallFailed),
    EthTransferFailed(EthTransferFailed),
}

impl PearlExchange {
    fn ensure_owner(&self) -> Result<(), PearlExchangeError> {
        let caller = self.vm().msg_sender();
        if caller != self.owner.get() {
            return Err(PearlExchangeError::Unauthorized(Unauthorized { caller }));
        }
        Ok(())
    }

    /// PEARL held by this contract, read from the token contract.
    fn token_balance_of_self(&self) -> Result<U256, PearlExchangeError> {
        let this = self.vm().contract_address();
        let token = IERC20::new(self.pearl_token.get());
        token
            .balance_of(self.vm(), Call::new(), this)
            .map_err(|_| PearlExchangeError::TokenCallFailed(TokenCallFailed {}))
    }
}

#[public]
impl PearlExchange {
    #[constructor]
    pub fn constructor(&mut self, pearl_token: Address, initial_rate: U256) {
        // Use tx_origin instead of msg_sender because deployment goes through a factory.
        let owner = self.vm().tx_origin();
        self.owner.set(owner);
        self.pearl_token.set(pearl_token);
        self.pearl_per_eth_rate.set(initial_rate);
    }

    /// Swaps the attached ETH for PEARL at the current rate.
    /// The PEARL comes out of the contract's own token balance; the attached
    /// ETH stays in the contract as the other half of the reserve.
    #[payable]
    pub fn exchange_eth_for_pearl(&mut self) -> Result<U256, PearlExchangeError> {
        let eth_in = self.vm().msg_value();
        if eth_in.is_zero() {
            return Err(PearlExchangeError::ZeroAmount(ZeroAmount {}));
        }
        let rate = self.pearl_per_eth_rate.get();
        if rate.is_zero() {
            return Err(PearlExchangeError::ZeroRate(ZeroRate {}));
        }

        // Multiply before dividing to minimize rounding loss.
        let pearl_out = eth_in
            .checked_mul(rate)
            .ok_or(PearlExchangeError::Overflow(Overflow {}))?
            / ONE_ETH;
        if pearl_out.is_zero() {
            return Err(PearlExchangeError::AmountTooSmall(AmountTooSmall {
                amount: eth_in,
            }));
        }

        let have = self.token_balance_of_self()?;
        if have < pearl_out {
            return Err(PearlExchangeError::InsufficientPearlReserve(
                InsufficientPearlReserve {
                    have,
                    want: pearl_out,
                },
            ));
        }

        let user = self.vm().msg_sender();
        let token = IERC20::new(self.pearl_token.get());
        let context = Call::new_mutating(self);
        let sent = token
            .transfer(self.vm(), context, user, pearl_out)
            .map_err(|_| PearlExchangeError::TokenCallFailed(TokenCallFailed {}))?;
        if !sent {
            return Err(PearlExchangeError::TokenCallFailed(TokenCallFailed {}));
        }

        self.vm().log(EthExchangedForPearl {
                user,
                eth_in,
                pearl_out,
            },
        );
        Ok(pearl_out)
    }

    /// Swaps `pearl_amount` PEARL for ETH at the current rate.
    /// The caller must have approved this contract for at least `pearl_amount`.
    /// The token pull is confirmed before any ETH leaves, so a failure on
    /// either leg unwinds the whole trade.
    pub fn exchange_pearl_for_eth(&mut self, pearl_amount: U256) -> Result<U256, PearlExchangeError> {
        if pearl_amount.is_zero() {
            return Err(PearlExchangeError::ZeroAmount(ZeroAmount {}));
        }
        let rate = self.pearl_per_eth_rate.get();
        if rate.is_zero() {
            return Err(PearlExchangeError::ZeroRate(ZeroRate {}));
        }

        let eth_out = pearl_amount
            .checked_mul(ONE_ETH)
            .ok_or(PearlExchangeError::Overflow(Overflow {}))?
            / rate;
        if eth_out.is_zero() {
            return Err(PearlExchangeError::AmountTooSmall(AmountTooSmall {
                amount: pearl_amount,
            }));
        }

        let this = self.vm().contract_address();
        let have = self.vm().balance(this);
        if have < eth_out {
            return Err(PearlExchangeError::InsufficientEthReserve(
                InsufficientEthReserve {
                    have,
                    want: eth_out,
                },
            ));
        }

        let user = self.vm().msg_sender();
        let token = IERC20::new(self.pearl_token.get());
        let context = Call::new_mutating(self);
        let pulled = token
            .transfer_from(self.vm(), context, user, this, pearl_amount)
            .map_err(|_| PearlExchangeError::TokenCallFailed(TokenCallFailed {}))?;
        if !pulled {
            return Err(PearlExchangeError::TokenCallFailed(TokenCallFailed {}));
        }

        transfer_eth(self.vm(), user, eth_out)
            .map_err(|_| PearlExchangeError::EthTransferFailed(EthTransferFailed {}))?;

        self.vm().log(PearlExchangedForEth {
                user,
                pearl_in: pearl_amount,
                eth_out,
            },
        );
        Ok(eth_out)
    }

    /// Overwrites the exchange rate. A zero rate is rejected: the historical
    /// rate-in-wrong-units deployment made every trade floor to dust.
    pub fn set_exchange_rate(&mut self, new_rate: U256) -> Result<(), PearlExchangeError> {
        self.ensure_owner()?;
        if new_rate.is_zero() {
            return Err(PearlExchangeError::ZeroRate(ZeroRate {}));
        }
        let old_rate = self.pearl_per_eth_rate.get();
        self.pearl_per_eth_rate.set(new_rate);
        self.vm().log(ExchangeRateUpdated { old_rate, new_rate });
        Ok(())
    }

    /// Tops up the contract's ETH reserve with no token movement.
    #[payable]
    pub fn deposit_eth(&mut self) -> Result<(), PearlExchangeError> {
        let amount = self.vm().msg_value();
        if amount.is_zero() {
            return Err(PearlExchangeError::ZeroAmount(ZeroAmount {}));
        }
        let from = self.vm().msg_sender();
        self.vm().log(EthDeposited { from, amount });
        Ok(())
    }

    pub fn withdraw_eth(&mut self, amount: U256) -> Result<(), PearlExchangeError> {
        self.ensure_owner()?;
        if amount.is_zero() {
            return Err(PearlExchangeError::ZeroAmount(ZeroAmount {}));
        }
        let this = self.vm().contract_address();
        let have = self.vm().balance(this);
        if have < amount {
            return Err(PearlExchangeError::InsufficientEthReserve(
                InsufficientEthReserve { have, want: amount },
            ));
        }
        let to = self.vm().msg_sender();
        transfer_eth(self.vm(), to, amount)
            .map_err(|_| PearlExchangeError::EthTransferFailed(EthTransferFailed {}))?;
        self.vm().log(EthWithdrawn { to, amount });
        Ok(())
    }

    pub fn withdraw_pearl(&mut self, amount: U256) -> Result<(), PearlExchangeError> {
        self.ensure_owner()?;
        if amount.is_zero() {
            return Err(PearlExchangeError::ZeroAmount(ZeroAmount {}));
        }
        let have = self.token_balance_of_self()?;
        if have < amount {
            return Err(PearlExchangeError::InsufficientPearlReserve(
                InsufficientPearlReserve { have, want: amount },
            ));
        }
        let to = self.vm().msg_sender();
        let token = IERC20::new(self.pearl_token.get());
        let context = Call::new_mutating(self);
        let sent = token
            .transfer(self.vm(), context, to, amount)
            .map_err(|_| PearlExchangeError::TokenCallFailed(TokenCallFailed {}))?;
        if !sent {
            return Err(PearlExchangeError::TokenCallFailed(TokenCallFailed {}));
        }
        self.vm().log(PearlWithdrawn { to, amount });
        Ok(())
    }

    pub fn transfer_ownership(&mut self, new_owner: Address) -> Result<(), PearlExchangeError> {
        self.ensure_owner()?;
        if new_owner == Address::ZERO {
            return Err(PearlExchangeError::ZeroAddress(ZeroAddress {}));
        }
        let previous_owner = self.owner.get();
        self.owner.set(new_owner);
        self.vm().log(OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
        Ok(())
    }

    pub fn pearl_per_eth_rate(&self) -> U256 {
        self.pearl_per_eth_rate.get()
    }

    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    pub fn pearl_token(&self) -> Address {
        self.pearl_token.get()
    }

    /// PEARL reserve, delegated to the token contract.
    pub fn pearl_reserve(&self) -> Result<U256, PearlExchangeError> {
        self.token_balance_of_self()
    }

    /// ETH reserve, the contract's own native balance.
    pub fn eth_reserve(&self) -> U256 {
        let this = self.vm().contract_address();
        self.vm().balance(this)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::address;
    use alloy_sol_types::{sol, SolCall, SolValue};
    use stylus_sdk::testing::*;

    // Mirrors of the ERC-20 calls the exchange makes, used to build the exact
    // calldata the TestVM mocks are keyed on.
    sol! {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }

    const TOKEN: Address = address!("1000000000000000000000000000000000000001");
    const DEPLOYER: Address = address!("2000000000000000000000000000000000000002");

    /// 1000 PEARL per ETH, in base units.
    fn rate_1000() -> U256 {
        U256::from(1000u64) * ONE_ETH
    }

    fn pearl(whole: u64) -> U256 {
        U256::from(whole) * ONE_ETH
    }

    fn eth(whole: u64) -> U256 {
        U256::from(whole) * ONE_ETH
    }

    fn deploy(vm: &TestVM) -> PearlExchange {
        let mut contract = PearlExchange::from(vm);
        vm.set_tx_origin(DEPLOYER);
        contract.constructor(TOKEN, rate_1000());
        contract
    }

    fn mock_reserve(vm: &TestVM, reserve: U256) {
        let this = vm.contract_address();
        let data = balanceOfCall { owner: this }.abi_encode();
        vm.mock_static_call(TOKEN, data, Ok(reserve.abi_encode()));
    }

    #[test]
    fn constructor_sets_owner_token_and_rate() {
        let vm = TestVM::default();
        let contract = deploy(&vm);
        assert_eq!(contract.owner(), DEPLOYER);
        assert_eq!(contract.pearl_token(), TOKEN);
        assert_eq!(contract.pearl_per_eth_rate(), rate_1000());
    }

    #[test]
    fn eth_for_pearl_pays_out_at_rate() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        // 5M PEARL reserve, caller sends 1 ETH.
        mock_reserve(&vm, pearl(5_000_000));
        let expected_out = pearl(1000);
        let transfer_data = transferCall {
            to: vm.msg_sender(),
            value: expected_out,
        }
        .abi_encode();
        vm.mock_call(TOKEN, transfer_data, U256::ZERO, Ok(true.abi_encode()));

        vm.set_value(eth(1));
        let out = contract.exchange_eth_for_pearl().unwrap();
        assert_eq!(out, expected_out);

        let logs = vm.get_emitted_logs();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn eth_for_pearl_rejects_zero_value() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);
        vm.set_value(U256::ZERO);
        assert!(matches!(
            contract.exchange_eth_for_pearl(),
            Err(PearlExchangeError::ZeroAmount(_))
        ));
    }

    #[test]
    fn eth_for_pearl_rejects_dust() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);
        vm.set_tx_origin(DEPLOYER);
        vm.set_sender(DEPLOYER);
        // Rate of 1 PEARL base-unit per ETH makes any sub-ETH trade floor to zero.
        contract.set_exchange_rate(U256::from(1u64)).unwrap();
        vm.set_value(U256::from(1u64));
        assert!(matches!(
            contract.exchange_eth_for_pearl(),
            Err(PearlExchangeError::AmountTooSmall(_))
        ));
    }

    #[test]
    fn eth_for_pearl_rejects_insufficient_reserve() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        // Empty reserve: any positive trade must revert.
        mock_reserve(&vm, U256::ZERO);
        vm.set_value(eth(1));
        assert!(matches!(
            contract.exchange_eth_for_pearl(),
            Err(PearlExchangeError::InsufficientPearlReserve(_))
        ));
    }

    #[test]
    fn pearl_for_eth_pays_out_at_rate() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        let this = vm.contract_address();
        vm.set_balance(this, eth(100));

        // 500 PEARL at 1000 PEARL/ETH comes back as 0.5 ETH.
        let pearl_in = pearl(500);
        let pull_data = transferFromCall {
            from: vm.msg_sender(),
            to: this,
            value: pearl_in,
        }
        .abi_encode();
        vm.mock_call(TOKEN, pull_data, U256::ZERO, Ok(true.abi_encode()));

        let out = contract.exchange_pearl_for_eth(pearl_in).unwrap();
        assert_eq!(out, ONE_ETH / U256::from(2u64));
    }

    #[test]
    fn pearl_for_eth_rejects_insufficient_eth_reserve() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        let this = vm.contract_address();
        vm.set_balance(this, U256::ZERO);
        assert!(matches!(
            contract.exchange_pearl_for_eth(pearl(500)),
            Err(PearlExchangeError::InsufficientEthReserve(_))
        ));
    }

    #[test]
    fn pearl_for_eth_rejects_failed_pull() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        let this = vm.contract_address();
        vm.set_balance(this, eth(100));

        let pearl_in = pearl(500);
        let pull_data = transferFromCall {
            from: vm.msg_sender(),
            to: this,
            value: pearl_in,
        }
        .abi_encode();
        // Token reverts the pull (no allowance): the whole trade must fail.
        vm.mock_call(TOKEN, pull_data, U256::ZERO, Err(vec![0xff]));

        assert!(matches!(
            contract.exchange_pearl_for_eth(pearl_in),
            Err(PearlExchangeError::TokenCallFailed(_))
        ));
    }

    #[test]
    fn round_trip_never_exceeds_input() {
        let vm = TestVM::default();
        let contract = deploy(&vm);
        let rate = contract.pearl_per_eth_rate();

        // An ETH amount that doesn't divide evenly through both conversions.
        let eth_in = U256::from(1_234_567_890_123_456_789u64);
        let pearl_out = eth_in * rate / ONE_ETH;
        let eth_back = pearl_out * ONE_ETH / rate;
        assert!(eth_back <= eth_in);
        // Floor division loses at most one base unit per conversion.
        assert!(eth_in - eth_back <= U256::from(1u64) + ONE_ETH / rate);
    }

    #[test]
    fn set_exchange_rate_owner_only() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        // Default test sender is not the deployer.
        assert!(matches!(
            contract.set_exchange_rate(rate_1000()),
            Err(PearlExchangeError::Unauthorized(_))
        ));

        vm.set_sender(DEPLOYER);
        contract.set_exchange_rate(pearl(2000)).unwrap();
        assert_eq!(contract.pearl_per_eth_rate(), pearl(2000));
    }

    #[test]
    fn set_exchange_rate_rejects_zero() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);
        vm.set_sender(DEPLOYER);
        assert!(matches!(
            contract.set_exchange_rate(U256::ZERO),
            Err(PearlExchangeError::ZeroRate(_))
        ));
    }

    #[test]
    fn deposit_eth_requires_value() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        vm.set_value(U256::ZERO);
        assert!(contract.deposit_eth().is_err());

        vm.set_value(eth(100));
        contract.deposit_eth().unwrap();
        let logs = vm.get_emitted_logs();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn withdrawals_are_owner_only() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);

        assert!(matches!(
            contract.withdraw_eth(eth(1)),
            Err(PearlExchangeError::Unauthorized(_))
        ));
        assert!(matches!(
            contract.withdraw_pearl(pearl(1)),
            Err(PearlExchangeError::Unauthorized(_))
        ));

        vm.set_sender(DEPLOYER);
        let this = vm.contract_address();
        vm.set_balance(this, eth(10));
        contract.withdraw_eth(eth(1)).unwrap();

        mock_reserve(&vm, pearl(100));
        let send_data = transferCall {
            to: DEPLOYER,
            value: pearl(5),
        }
        .abi_encode();
        vm.mock_call(TOKEN, send_data, U256::ZERO, Ok(true.abi_encode()));
        contract.withdraw_pearl(pearl(5)).unwrap();
    }

    #[test]
    fn transfer_ownership_hands_over_control() {
        let vm = TestVM::default();
        let mut contract = deploy(&vm);
        let new_owner = address!("3000000000000000000000000000000000000003");

        vm.set_sender(DEPLOYER);
        assert!(matches!(
            contract.transfer_ownership(Address::ZERO),
            Err(PearlExchangeError::ZeroAddress(_))
        ));
        contract.transfer_ownership(new_owner).unwrap();
        assert_eq!(contract.owner(), new_owner);

        // The previous owner is locked out.
        assert!(matches!(
            contract.set_exchange_rate(rate_1000()),
            Err(PearlExchangeError::Unauthorized(_))
        ));
    }
}
