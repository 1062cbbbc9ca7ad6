//! Channel settlement contract model.
//!
//! Deterministic state machine mirroring the on-chain escrow: it holds both
//! deposits, verifies house-signed EIP-712 states, enforces nonce
//! monotonicity and conservation, skims insurance from house profit, and
//! falls back to pull payments when a transfer is refused. Timestamps come
//! in as arguments (block time); transfers leave through a [`PaymentSink`].
//!
//! Settlement follows effects-before-interactions: channel storage is
//! cleared and counters updated before any payout is attempted.

use ethers::types::{Address, Signature};
use tracing::{info, warn};

use agentcasino_types::constants::{BPS_DENOMINATOR, OWNER_ROTATION_TIMELOCK_SECS};
use agentcasino_types::{
    recover_signer, Channel, ChannelDomain, ChannelState, ChannelStatus, SettlementConfig,
};
use std::collections::HashMap;

use crate::bankroll::BankrollManager;
use crate::error::ContractError;
use crate::insurance::InsuranceFund;
use crate::payments::PaymentSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingOwner {
    new_owner: Address,
    execute_after: u64,
}

pub struct SettlementContract {
    /// This contract's address: the EIP-712 verifying contract.
    address: Address,
    chain_id: u64,
    /// Operator account: receives house payouts, signs channel states.
    house: Address,
    config: SettlementConfig,
    channels: HashMap<Address, Channel>,
    pending_withdrawals: HashMap<Address, u128>,
    escrow: u128,
    bankroll: Option<BankrollManager>,
    insurance: Option<InsuranceFund>,
    pending_owner: Option<PendingOwner>,
}

impl SettlementContract {
    /// Deploy unwired: bankroll and insurance modules are injected
    /// afterward via the setters.
    pub fn new(address: Address, chain_id: u64, house: Address, config: SettlementConfig) -> Self {
        Self {
            address,
            chain_id,
            house,
            config,
            channels: HashMap::new(),
            pending_withdrawals: HashMap::new(),
            escrow: 0,
            bankroll: None,
            insurance: None,
            pending_owner: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn house(&self) -> Address {
        self.house
    }

    pub fn domain(&self) -> ChannelDomain {
        ChannelDomain::new(self.chain_id, self.address)
    }

    pub fn escrow(&self) -> u128 {
        self.escrow
    }

    pub fn channel(&self, agent: Address) -> Option<&Channel> {
        self.channels.get(&agent)
    }

    pub fn pending_withdrawal_of(&self, payee: Address) -> u128 {
        self.pending_withdrawals.get(&payee).copied().unwrap_or(0)
    }

    pub fn total_locked(&self) -> u128 {
        self.bankroll.as_ref().map_or(0, BankrollManager::total_locked)
    }

    pub fn insurance_balance(&self) -> u128 {
        self.insurance.as_ref().map_or(0, InsuranceFund::balance)
    }

    // -- module wiring ----------------------------------------------------

    pub fn set_bankroll_manager(
        &mut self,
        caller: Address,
        manager: BankrollManager,
    ) -> Result<(), ContractError> {
        if caller != self.house {
            return Err(ContractError::NotAuthorized(caller));
        }
        self.bankroll = Some(manager);
        Ok(())
    }

    pub fn set_insurance_fund(
        &mut self,
        caller: Address,
        fund: InsuranceFund,
    ) -> Result<(), ContractError> {
        if caller != self.house {
            return Err(ContractError::NotAuthorized(caller));
        }
        self.insurance = Some(fund);
        Ok(())
    }

    // -- channel lifecycle ------------------------------------------------

    /// Agent opens a channel by escrowing `value`.
    pub fn open_channel(
        &mut self,
        caller: Address,
        value: u128,
        now: u64,
    ) -> Result<(), ContractError> {
        if value < self.config.min_deposit || value > self.config.max_deposit {
            return Err(ContractError::DepositOutOfRange {
                amount: value,
                min: self.config.min_deposit,
                max: self.config.max_deposit,
            });
        }
        if self.channels.contains_key(&caller) {
            return Err(ContractError::ChannelExists(caller));
        }
        self.channels.insert(caller, Channel::open(caller, value, 0, now));
        self.escrow += value;
        info!(agent = ?caller, value, "channel opened on-chain");
        Ok(())
    }

    /// House escrows its collateral into an open channel, once.
    pub fn fund_casino_side(
        &mut self,
        caller: Address,
        agent: Address,
        value: u128,
    ) -> Result<(), ContractError> {
        if caller != self.house {
            return Err(ContractError::NotAuthorized(caller));
        }
        let address = self.address;
        let channel = self
            .channels
            .get_mut(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;
        if channel.status != ChannelStatus::Open {
            return Err(ContractError::BadChannelState {
                agent,
                status: channel.status,
            });
        }
        if channel.house_deposit != 0 {
            return Err(ContractError::AlreadyFunded);
        }
        self.bankroll
            .as_mut()
            .ok_or(ContractError::ModuleNotWired("bankroll"))?
            .lock(address, value)?;

        let channel = self.channels.get_mut(&agent).expect("checked above");
        channel.house_deposit = value;
        channel.house_balance = value;
        self.escrow += value;
        info!(agent = ?agent, value, "house side funded");
        Ok(())
    }

    /// Cooperative close with the latest house-signed state.
    pub fn close_channel(
        &mut self,
        caller: Address,
        agent_balance: u128,
        house_balance: u128,
        nonce: u64,
        signature: &Signature,
        payments: &mut dyn PaymentSink,
    ) -> Result<(), ContractError> {
        let channel = self.open_channel_of(caller)?;
        Self::check_nonce(nonce, channel.nonce, false)?;
        self.verify_state(caller, agent_balance, house_balance, nonce, signature)?;
        self.settle(caller, agent_balance, house_balance, payments)
    }

    /// Agent opens a dispute with a signed state; settles after the
    /// challenge period unless countered with a strictly higher nonce.
    pub fn start_challenge(
        &mut self,
        caller: Address,
        agent_balance: u128,
        house_balance: u128,
        nonce: u64,
        signature: &Signature,
        now: u64,
    ) -> Result<(), ContractError> {
        let channel = self.open_channel_of(caller)?;
        Self::check_nonce(nonce, channel.nonce, false)?;
        self.verify_state(caller, agent_balance, house_balance, nonce, signature)?;

        let deadline = now + self.config.challenge_period_secs;
        let channel = self.channels.get_mut(&caller).expect("checked above");
        channel.status = ChannelStatus::Disputed;
        channel.agent_balance = agent_balance;
        channel.house_balance = house_balance;
        channel.nonce = nonce;
        channel.dispute_deadline = deadline;
        info!(agent = ?caller, nonce, deadline, "challenge started");
        Ok(())
    }

    /// Override a disputed state with a strictly later signed state.
    /// Resets the dispute deadline.
    pub fn counter_challenge(
        &mut self,
        agent: Address,
        agent_balance: u128,
        house_balance: u128,
        nonce: u64,
        signature: &Signature,
        now: u64,
    ) -> Result<(), ContractError> {
        let channel = self
            .channels
            .get(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;
        if channel.status != ChannelStatus::Disputed {
            return Err(ContractError::BadChannelState {
                agent,
                status: channel.status,
            });
        }
        if now > channel.dispute_deadline {
            return Err(ContractError::DeadlinePassed);
        }
        Self::check_nonce(nonce, channel.nonce, true)?;
        self.verify_state(agent, agent_balance, house_balance, nonce, signature)?;

        let deadline = now + self.config.challenge_period_secs;
        let channel = self.channels.get_mut(&agent).expect("checked above");
        channel.agent_balance = agent_balance;
        channel.house_balance = house_balance;
        channel.nonce = nonce;
        channel.dispute_deadline = deadline;
        info!(agent = ?agent, nonce, deadline, "challenge countered");
        Ok(())
    }

    /// Anyone may settle a dispute once the deadline passed.
    pub fn resolve_challenge(
        &mut self,
        agent: Address,
        now: u64,
        payments: &mut dyn PaymentSink,
    ) -> Result<(), ContractError> {
        let channel = self
            .channels
            .get(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;
        if channel.status != ChannelStatus::Disputed {
            return Err(ContractError::BadChannelState {
                agent,
                status: channel.status,
            });
        }
        if now <= channel.dispute_deadline {
            return Err(ContractError::DeadlineNotReached);
        }
        let (agent_balance, house_balance) = (channel.agent_balance, channel.house_balance);
        info!(agent = ?agent, nonce = channel.nonce, "challenge resolved");
        self.settle(agent, agent_balance, house_balance, payments)
    }

    /// Escape hatch for a channel no game ever touched: original deposits
    /// return to both sides after the minimum channel duration.
    pub fn emergency_exit(
        &mut self,
        caller: Address,
        now: u64,
        payments: &mut dyn PaymentSink,
    ) -> Result<(), ContractError> {
        let channel = self.open_channel_of(caller)?;
        if channel.nonce != 0 {
            return Err(ContractError::NonZeroNonce(channel.nonce));
        }
        if now.saturating_sub(channel.opened_at) < self.config.min_channel_duration_secs {
            return Err(ContractError::ChannelTooYoung);
        }
        let (agent_deposit, house_deposit) = (channel.agent_deposit, channel.house_deposit);
        info!(agent = ?caller, "emergency exit");
        self.settle(caller, agent_deposit, house_deposit, payments)
    }

    /// Pull-payment fallback for a payee whose direct transfer failed.
    pub fn withdraw_pending(
        &mut self,
        caller: Address,
        payments: &mut dyn PaymentSink,
    ) -> Result<u128, ContractError> {
        let amount = self
            .pending_withdrawals
            .remove(&caller)
            .ok_or(ContractError::NothingPending)?;
        if !payments.pay(caller, amount) {
            self.pending_withdrawals.insert(caller, amount);
            return Err(ContractError::TransferFailed);
        }
        self.escrow -= amount;
        Ok(amount)
    }

    // -- ownership rotation -----------------------------------------------

    pub fn transfer_casino(
        &mut self,
        caller: Address,
        new_owner: Address,
        now: u64,
    ) -> Result<(), ContractError> {
        if caller != self.house {
            return Err(ContractError::NotAuthorized(caller));
        }
        self.pending_owner = Some(PendingOwner {
            new_owner,
            execute_after: now + OWNER_ROTATION_TIMELOCK_SECS,
        });
        Ok(())
    }

    /// Second step of the handover. Refused while any collateral is locked:
    /// open channels must settle against the key that signed their states.
    pub fn accept_casino(&mut self, caller: Address, now: u64) -> Result<(), ContractError> {
        let pending = self.pending_owner.ok_or(ContractError::NothingPending)?;
        if caller != pending.new_owner {
            return Err(ContractError::NotAuthorized(caller));
        }
        if now < pending.execute_after {
            return Err(ContractError::TimelockActive);
        }
        let locked = self.total_locked();
        if locked > 0 {
            return Err(ContractError::CollateralLocked(locked));
        }
        self.house = pending.new_owner;
        self.pending_owner = None;
        info!(house = ?self.house, "casino ownership rotated");
        Ok(())
    }

    pub fn cancel_transfer_casino(&mut self, caller: Address) -> Result<(), ContractError> {
        if caller != self.house {
            return Err(ContractError::NotAuthorized(caller));
        }
        if self.pending_owner.take().is_none() {
            return Err(ContractError::NothingPending);
        }
        Ok(())
    }

    // -- insurance passthrough --------------------------------------------

    pub fn request_insurance_withdrawal(
        &mut self,
        caller: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), ContractError> {
        self.insurance
            .as_mut()
            .ok_or(ContractError::ModuleNotWired("insurance"))?
            .request_withdrawal(caller, amount, now)
    }

    pub fn execute_insurance_withdrawal(
        &mut self,
        caller: Address,
        now: u64,
        payments: &mut dyn PaymentSink,
    ) -> Result<u128, ContractError> {
        self.insurance
            .as_mut()
            .ok_or(ContractError::ModuleNotWired("insurance"))?
            .execute_withdrawal(caller, now, payments)
    }

    pub fn cancel_insurance_withdrawal(&mut self, caller: Address) -> Result<(), ContractError> {
        self.insurance
            .as_mut()
            .ok_or(ContractError::ModuleNotWired("insurance"))?
            .cancel_withdrawal(caller)
    }

    // -- internals --------------------------------------------------------

    fn open_channel_of(&self, agent: Address) -> Result<&Channel, ContractError> {
        let channel = self
            .channels
            .get(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;
        if channel.status != ChannelStatus::Open {
            return Err(ContractError::BadChannelState {
                agent,
                status: channel.status,
            });
        }
        Ok(channel)
    }

    fn check_nonce(submitted: u64, stored: u64, strict: bool) -> Result<(), ContractError> {
        let ok = if strict {
            submitted > stored
        } else {
            submitted >= stored
        };
        if ok {
            Ok(())
        } else {
            Err(ContractError::StaleNonce { submitted, stored })
        }
    }

    /// Conservation against the escrowed deposits, then signature recovery
    /// against the house account.
    fn verify_state(
        &self,
        agent: Address,
        agent_balance: u128,
        house_balance: u128,
        nonce: u64,
        signature: &Signature,
    ) -> Result<(), ContractError> {
        let channel = self
            .channels
            .get(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;
        let deposits = channel.total_deposits();
        let total = agent_balance
            .checked_add(house_balance)
            .ok_or(ContractError::ConservationViolated {
                agent_balance,
                house_balance,
                deposits,
            })?;
        if total != deposits {
            return Err(ContractError::ConservationViolated {
                agent_balance,
                house_balance,
                deposits,
            });
        }
        let state = ChannelState::new(agent, agent_balance, house_balance, nonce);
        let recovered = recover_signer(&state, &self.domain(), signature)
            .map_err(|_| ContractError::BadSignature)?;
        if recovered != self.house {
            return Err(ContractError::BadSignature);
        }
        Ok(())
    }

    /// Clear the channel, skim insurance from house profit, then pay out.
    fn settle(
        &mut self,
        agent: Address,
        agent_balance: u128,
        house_balance: u128,
        payments: &mut dyn PaymentSink,
    ) -> Result<(), ContractError> {
        let address = self.address;
        let channel = self
            .channels
            .remove(&agent)
            .ok_or(ContractError::ChannelNotFound(agent))?;

        if channel.house_deposit > 0 {
            self.bankroll
                .as_mut()
                .ok_or(ContractError::ModuleNotWired("bankroll"))?
                .unlock(address, channel.house_deposit)?;
        }

        let profit = house_balance.saturating_sub(channel.house_deposit);
        let insurance_cut =
            profit * self.config.insurance_bps as u128 / BPS_DENOMINATOR as u128;
        if insurance_cut > 0 {
            self.insurance
                .as_mut()
                .ok_or(ContractError::ModuleNotWired("insurance"))?
                .deposit(address, insurance_cut)?;
            self.escrow -= insurance_cut;
        }
        let house_payout = house_balance - insurance_cut;

        info!(
            agent = ?agent,
            agent_balance,
            house_payout,
            insurance_cut,
            "channel settled"
        );
        self.payout(agent, agent_balance, payments);
        let house = self.house;
        self.payout(house, house_payout, payments);
        Ok(())
    }

    fn payout(&mut self, to: Address, amount: u128, payments: &mut dyn PaymentSink) {
        if amount == 0 {
            return;
        }
        if payments.pay(to, amount) {
            self.escrow -= amount;
        } else {
            warn!(to = ?to, amount, "transfer refused, rerouting to pull payment");
            *self.pending_withdrawals.entry(to).or_insert(0) += amount;
        }
    }
}
