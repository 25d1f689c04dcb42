//! Pool simulator
//!
//! The off-ledger twin of the on-chain pools: same engine, same gate, state
//! held in an injected [`PoolStore`], plus demo wallets so a caller's USDO
//! and YES/NO holdings move with each operation. Nothing produced here
//! settles real collateral.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use corner_core::{Address, Amount, MarketId, SimulatorConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::engine;
use crate::gate;
use crate::state::{CpmmError, MarketStatus, Operation, Outputs, Pool, Side, Transition};
use crate::store::{MarketEntry, PoolStore};

/// Outcome tokens a wallet holds in one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes: Amount,
    pub no: Amount,
}

impl Position {
    pub fn get(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }
}

/// Simulated holdings of one address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoWallet {
    pub usdo: Amount,
    pub positions: BTreeMap<MarketId, Position>,
}

impl DemoWallet {
    pub fn new(usdo: Amount) -> Self {
        Self {
            usdo,
            positions: BTreeMap::new(),
        }
    }

    pub fn position(&self, market_id: &MarketId) -> Position {
        self.positions.get(market_id).copied().unwrap_or_default()
    }

    /// Wallet after paying the inputs of `operation` and receiving `outputs`
    fn settle(
        &self,
        market_id: &MarketId,
        operation: &Operation,
        outputs: &Outputs,
    ) -> Result<Self, CpmmError> {
        let mut next = self.clone();
        let position = next.positions.entry(market_id.clone()).or_default();

        match (*operation, *outputs) {
            (Operation::Split { usdo_in }, Outputs::Split { yes_out, no_out }) => {
                debit(&mut next.usdo, usdo_in, "USDO")?;
                credit(&mut position.yes, yes_out)?;
                credit(&mut position.no, no_out)?;
            }
            (
                Operation::SwapYesForNo { yes_in, .. },
                Outputs::Swap {
                    side_out: Side::No,
                    amount_out,
                },
            ) => {
                debit(&mut position.yes, yes_in, "YES")?;
                credit(&mut position.no, amount_out)?;
            }
            (
                Operation::SwapNoForYes { no_in, .. },
                Outputs::Swap {
                    side_out: Side::Yes,
                    amount_out,
                },
            ) => {
                debit(&mut position.no, no_in, "NO")?;
                credit(&mut position.yes, amount_out)?;
            }
            (Operation::Join { yes_in, no_in }, Outputs::Join { usdo_out }) => {
                debit(&mut position.yes, yes_in, "YES")?;
                debit(&mut position.no, no_in, "NO")?;
                credit(&mut next.usdo, usdo_out)?;
            }
            (Operation::Redeem { side, amount }, Outputs::Redeem { usdo_out }) => {
                let asset = match side {
                    Side::Yes => "YES",
                    Side::No => "NO",
                };
                debit(position.get_mut(side), amount, asset)?;
                credit(&mut next.usdo, usdo_out)?;
            }
            _ => {
                return Err(CpmmError::invalid_amount(
                    "operation and outputs do not match",
                ))
            }
        }

        Ok(next)
    }
}

fn debit(balance: &mut Amount, amount: Amount, asset: &'static str) -> Result<(), CpmmError> {
    if *balance < amount {
        return Err(CpmmError::InsufficientBalance {
            asset,
            required: amount,
            available: *balance,
        });
    }
    *balance -= amount;
    Ok(())
}

fn credit(balance: &mut Amount, amount: Amount) -> Result<(), CpmmError> {
    *balance = balance
        .checked_add(amount)
        .ok_or(CpmmError::AmountOverflow)?;
    Ok(())
}

/// Result of a split-then-swap purchase of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOutcome {
    pub side: Side,
    pub usdo_in: Amount,
    /// Wanted-side tokens from the split leg
    pub split_out: Amount,
    /// Wanted-side tokens from swapping the unwanted leg
    pub swap_out: Amount,
}

impl BuyOutcome {
    pub fn total_out(&self) -> Amount {
        self.split_out + self.swap_out
    }
}

/// In-memory market simulator
pub struct Simulator {
    store: Arc<PoolStore>,
    wallets: Mutex<HashMap<Address, DemoWallet>>,
    config: SimulatorConfig,
}

impl Simulator {
    pub fn new(store: Arc<PoolStore>, config: SimulatorConfig) -> Self {
        Self {
            store,
            wallets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Simulator over a fresh store holding the configured demo markets
    pub fn with_demo_markets(config: SimulatorConfig) -> Result<Self, CpmmError> {
        let entries = config
            .markets
            .iter()
            .map(|id| Self::seeded_entry(&MarketId::new(id.as_str()), config.initial_liquidity))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Simulator: seeded {} demo market(s)", entries.len());
        Ok(Self::new(Arc::new(PoolStore::with_entries(entries)), config))
    }

    /// Open market whose pool is split 50/50 from `initial_usdo`
    pub fn seeded_entry(market_id: &MarketId, initial_usdo: Amount) -> Result<MarketEntry, CpmmError> {
        let (pool, _, _) = engine::split(&Pool::new(market_id.clone()), initial_usdo)?;
        Ok(MarketEntry::open(pool))
    }

    pub fn store(&self) -> &Arc<PoolStore> {
        &self.store
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Register an open market with an empty (unseeded) pool
    pub async fn create_market(&self, market_id: &MarketId) -> Result<(), CpmmError> {
        self.store
            .insert(MarketEntry::open(Pool::new(market_id.clone())))
            .await?;
        tracing::info!("Simulator: created market {}", market_id);
        Ok(())
    }

    /// Create a market whose pool is seeded 50/50 from `initial_usdo`
    pub async fn init_pool(
        &self,
        market_id: &MarketId,
        initial_usdo: Amount,
    ) -> Result<Pool, CpmmError> {
        let entry = Self::seeded_entry(market_id, initial_usdo)?;
        let pool = entry.pool.clone();
        self.store.insert(entry).await?;
        tracing::info!("Simulator: seeded {}", pool);
        Ok(pool)
    }

    /// Seed the market with the configured liquidity on its first split
    pub async fn ensure_pool(&self, market_id: &MarketId) -> Result<Pool, CpmmError> {
        if self.store.contains(market_id).await {
            return self.store.get(market_id).await;
        }
        match self.init_pool(market_id, self.config.initial_liquidity).await {
            Ok(pool) => Ok(pool),
            // Another caller seeded it first
            Err(CpmmError::PoolAlreadyExists(_)) => self.store.get(market_id).await,
            Err(e) => Err(e),
        }
    }

    pub async fn pool(&self, market_id: &MarketId) -> Result<Pool, CpmmError> {
        self.store.get(market_id).await
    }

    pub async fn status(&self, market_id: &MarketId) -> Result<MarketStatus, CpmmError> {
        self.store.status(market_id).await
    }

    pub async fn snapshot(&self, market_id: &MarketId) -> Result<MarketEntry, CpmmError> {
        self.store.snapshot(market_id).await
    }

    /// Holdings of an address; unknown addresses show the starting balance
    pub async fn wallet(&self, address: &Address) -> DemoWallet {
        self.wallets
            .lock()
            .await
            .get(address)
            .cloned()
            .unwrap_or_else(|| DemoWallet::new(self.config.demo_wallet_balance))
    }

    /// Gate and apply one operation for `sender`, moving their demo holdings.
    /// Pool and wallet change together or not at all.
    pub async fn execute(
        &self,
        market_id: &MarketId,
        sender: &Address,
        operation: &Operation,
    ) -> Result<Transition, CpmmError> {
        let guard = self.store.lock(market_id).await?;
        let entry = guard.entry().clone();

        let transition = gate::apply(&entry.pool, &entry.status, operation)?;

        let mut wallets = self.wallets.lock().await;
        let wallet = wallets
            .get(sender)
            .cloned()
            .unwrap_or_else(|| DemoWallet::new(self.config.demo_wallet_balance));
        let wallet = wallet.settle(market_id, operation, &transition.outputs)?;
        wallets.insert(sender.clone(), wallet);

        guard
            .commit(MarketEntry {
                pool: transition.pool.clone(),
                status: entry.status,
            })
            .await;

        tracing::debug!(
            "Simulator: {} by {} on {} -> {:?}",
            operation.kind().as_str(),
            sender,
            market_id,
            transition.outputs
        );
        Ok(transition)
    }

    /// Buy one side with USDO: split, then swap the unwanted leg for the
    /// wanted side. `min_out` guards the swap leg. Atomic.
    pub async fn buy(
        &self,
        market_id: &MarketId,
        sender: &Address,
        side: Side,
        usdo_in: Amount,
        min_out: Amount,
    ) -> Result<(Pool, BuyOutcome), CpmmError> {
        let guard = self.store.lock(market_id).await?;
        let entry = guard.entry().clone();

        let split_op = Operation::Split { usdo_in };
        let split = gate::apply(&entry.pool, &entry.status, &split_op)?;
        let Outputs::Split { yes_out, no_out } = split.outputs else {
            return Err(CpmmError::invalid_amount("split produced no pair"));
        };
        let (wanted, unwanted) = match side {
            Side::Yes => (yes_out, no_out),
            Side::No => (no_out, yes_out),
        };

        let swap_op = Operation::swap(side.opposite(), unwanted, min_out);
        let swap = gate::apply(&split.pool, &entry.status, &swap_op)?;
        let Outputs::Swap { amount_out, .. } = swap.outputs else {
            return Err(CpmmError::invalid_amount("swap produced no output"));
        };

        let mut wallets = self.wallets.lock().await;
        let wallet = wallets
            .get(sender)
            .cloned()
            .unwrap_or_else(|| DemoWallet::new(self.config.demo_wallet_balance));
        let wallet = wallet
            .settle(market_id, &split_op, &split.outputs)?
            .settle(market_id, &swap_op, &swap.outputs)?;
        wallets.insert(sender.clone(), wallet);

        guard
            .commit(MarketEntry {
                pool: swap.pool.clone(),
                status: entry.status,
            })
            .await;

        let outcome = BuyOutcome {
            side,
            usdo_in,
            split_out: wanted,
            swap_out: amount_out,
        };
        tracing::debug!(
            "Simulator: {} bought {} {} with {} USDO on {}",
            sender,
            outcome.total_out(),
            side,
            usdo_in,
            market_id
        );
        Ok((swap.pool, outcome))
    }

    /// Resolve a market. Only an open market can be resolved.
    pub async fn resolve(
        &self,
        market_id: &MarketId,
        winning_side: Side,
    ) -> Result<MarketStatus, CpmmError> {
        let status = self
            .store
            .update(market_id, |entry| {
                let status = gate::resolve(&entry.status, winning_side)?;
                Ok::<_, CpmmError>((
                    MarketEntry {
                        pool: entry.pool.clone(),
                        status,
                    },
                    status,
                ))
            })
            .await?;

        tracing::info!("Simulator: market {} resolved, {} wins", market_id, winning_side);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::implied_yes_odds;

    const UNIT: Amount = 1_000_000_000;

    fn market() -> MarketId {
        MarketId::new("main-event")
    }

    fn alice() -> Address {
        Address::new("0xa11ce")
    }

    fn simulator() -> Simulator {
        Simulator::new(Arc::new(PoolStore::new()), SimulatorConfig::default())
    }

    async fn seeded() -> Simulator {
        let sim = simulator();
        sim.ensure_pool(&market()).await.unwrap();
        sim
    }

    #[tokio::test]
    async fn test_ensure_pool_seeds_default_liquidity() {
        let sim = simulator();
        let pool = sim.ensure_pool(&market()).await.unwrap();

        assert_eq!(pool.yes_balance(), 50 * UNIT);
        assert_eq!(pool.no_balance(), 50 * UNIT);
        assert_eq!(pool.k(), 2_500_000_000_000_000_000_000);
        assert_eq!(pool.collateral(), 100 * UNIT);

        // Second call is a no-op
        assert_eq!(sim.ensure_pool(&market()).await.unwrap(), pool);
    }

    #[tokio::test]
    async fn test_with_demo_markets() {
        let config = SimulatorConfig {
            markets: vec!["main-event".to_string(), "co-main".to_string()],
            ..SimulatorConfig::default()
        };
        let sim = Simulator::with_demo_markets(config).unwrap();

        assert_eq!(sim.pool(&market()).await.unwrap().collateral(), 100 * UNIT);
        assert_eq!(
            sim.status(&MarketId::new("co-main")).await,
            Ok(MarketStatus::Open)
        );
        assert_eq!(
            sim.pool(&MarketId::new("prelims")).await,
            Err(CpmmError::PoolNotFound(MarketId::new("prelims")))
        );
    }

    #[tokio::test]
    async fn test_unknown_market() {
        let sim = simulator();
        let result = sim
            .execute(&market(), &alice(), &Operation::Split { usdo_in: UNIT })
            .await;
        assert_eq!(result, Err(CpmmError::PoolNotFound(market())));
    }

    #[tokio::test]
    async fn test_first_split_seeds_created_market() {
        let sim = simulator();
        sim.create_market(&market()).await.unwrap();

        let t = sim
            .execute(&market(), &alice(), &Operation::Split { usdo_in: 100 * UNIT })
            .await
            .unwrap();
        assert_eq!(
            t.outputs,
            Outputs::Split {
                yes_out: 50 * UNIT,
                no_out: 50 * UNIT
            }
        );

        let wallet = sim.wallet(&alice()).await;
        assert_eq!(wallet.usdo, 9_900 * UNIT);
        assert_eq!(wallet.position(&market()), Position { yes: 50 * UNIT, no: 50 * UNIT });
    }

    #[tokio::test]
    async fn test_split_moves_wallet() {
        let sim = seeded().await;
        sim.execute(&market(), &alice(), &Operation::Split { usdo_in: 10 * UNIT })
            .await
            .unwrap();

        let wallet = sim.wallet(&alice()).await;
        assert_eq!(wallet.usdo, 9_990 * UNIT);
        assert_eq!(wallet.position(&market()), Position { yes: 10 * UNIT, no: 10 * UNIT });
        assert_eq!(sim.pool(&market()).await.unwrap().collateral(), 110 * UNIT);
    }

    #[tokio::test]
    async fn test_split_more_than_wallet_holds() {
        let sim = seeded().await;
        let result = sim
            .execute(&market(), &alice(), &Operation::Split { usdo_in: 10_001 * UNIT })
            .await;
        assert!(matches!(
            result,
            Err(CpmmError::InsufficientBalance { asset: "USDO", .. })
        ));
        // Pool unchanged
        assert_eq!(sim.pool(&market()).await.unwrap().collateral(), 100 * UNIT);
    }

    #[tokio::test]
    async fn test_swap_requires_holdings() {
        let sim = seeded().await;
        let result = sim
            .execute(
                &market(),
                &alice(),
                &Operation::SwapYesForNo {
                    yes_in: UNIT,
                    min_no_out: 0,
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(CpmmError::InsufficientBalance { asset: "YES", .. })
        ));
        assert_eq!(sim.pool(&market()).await.unwrap().yes_balance(), 50 * UNIT);
    }

    #[tokio::test]
    async fn test_swap_after_split() {
        let sim = seeded().await;
        sim.execute(&market(), &alice(), &Operation::Split { usdo_in: 10 * UNIT })
            .await
            .unwrap();
        let t = sim
            .execute(
                &market(),
                &alice(),
                &Operation::SwapYesForNo {
                    yes_in: 10 * UNIT,
                    min_no_out: 8 * UNIT,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            t.outputs,
            Outputs::Swap {
                side_out: Side::No,
                amount_out: 8_333_333_333
            }
        );
        let position = sim.wallet(&alice()).await.position(&market());
        assert_eq!(position.yes, 0);
        assert_eq!(position.no, 10 * UNIT + 8_333_333_333);
    }

    #[tokio::test]
    async fn test_buy_yes_raises_yes_odds() {
        let sim = seeded().await;
        let before = implied_yes_odds(&sim.pool(&market()).await.unwrap());

        let (pool, outcome) = sim
            .buy(&market(), &alice(), Side::Yes, 10 * UNIT, 0)
            .await
            .unwrap();

        assert_eq!(outcome.split_out, 10 * UNIT);
        assert_eq!(outcome.swap_out, 8_333_333_333);
        assert_eq!(outcome.total_out(), 18_333_333_333);
        assert!(implied_yes_odds(&pool) > before);

        let wallet = sim.wallet(&alice()).await;
        assert_eq!(wallet.usdo, 9_990 * UNIT);
        assert_eq!(
            wallet.position(&market()),
            Position {
                yes: 18_333_333_333,
                no: 0
            }
        );
        assert_eq!(pool.collateral(), 110 * UNIT);
    }

    #[tokio::test]
    async fn test_buy_slippage_rolls_back_split() {
        let sim = seeded().await;
        let result = sim
            .buy(&market(), &alice(), Side::No, 10 * UNIT, 9 * UNIT)
            .await;
        assert!(matches!(result, Err(CpmmError::SlippageExceeded { .. })));

        assert_eq!(sim.pool(&market()).await.unwrap().collateral(), 100 * UNIT);
        assert_eq!(sim.wallet(&alice()).await.usdo, 10_000 * UNIT);
    }

    #[tokio::test]
    async fn test_join_returns_collateral() {
        let sim = seeded().await;
        sim.execute(&market(), &alice(), &Operation::Split { usdo_in: 5 * UNIT })
            .await
            .unwrap();
        let t = sim
            .execute(
                &market(),
                &alice(),
                &Operation::Join {
                    yes_in: 5 * UNIT,
                    no_in: 5 * UNIT,
                },
            )
            .await
            .unwrap();

        assert_eq!(t.outputs, Outputs::Join { usdo_out: 5 * UNIT });
        assert_eq!(sim.wallet(&alice()).await.usdo, 10_000 * UNIT);
        assert_eq!(t.pool.collateral(), 100 * UNIT);
    }

    #[tokio::test]
    async fn test_resolution_lifecycle() {
        let sim = seeded().await;
        sim.buy(&market(), &alice(), Side::Yes, 20 * UNIT, 0)
            .await
            .unwrap();
        let held = sim.wallet(&alice()).await.position(&market()).yes;

        sim.resolve(&market(), Side::Yes).await.unwrap();
        assert_eq!(
            sim.resolve(&market(), Side::No).await,
            Err(CpmmError::MarketResolved)
        );

        assert_eq!(
            sim.execute(&market(), &alice(), &Operation::Split { usdo_in: UNIT })
                .await,
            Err(CpmmError::MarketResolved)
        );
        assert_eq!(
            sim.execute(
                &market(),
                &alice(),
                &Operation::Redeem {
                    side: Side::No,
                    amount: UNIT
                }
            )
            .await,
            Err(CpmmError::WrongSide {
                requested: Side::No,
                winning: Side::Yes
            })
        );

        let collateral_before = sim.pool(&market()).await.unwrap().collateral();
        let t = sim
            .execute(
                &market(),
                &alice(),
                &Operation::Redeem {
                    side: Side::Yes,
                    amount: held,
                },
            )
            .await
            .unwrap();
        assert_eq!(t.outputs, Outputs::Redeem { usdo_out: held });
        assert_eq!(t.pool.collateral(), collateral_before - held);
        assert_eq!(sim.wallet(&alice()).await.usdo, 9_980 * UNIT + held);
    }

    #[tokio::test]
    async fn test_redeem_while_open() {
        let sim = seeded().await;
        assert_eq!(
            sim.execute(
                &market(),
                &alice(),
                &Operation::Redeem {
                    side: Side::Yes,
                    amount: UNIT
                }
            )
            .await,
            Err(CpmmError::MarketNotResolved)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_buys_keep_collateral_ledger() {
        let sim = Arc::new(seeded().await);
        let mut handles = Vec::new();

        for i in 0..40u64 {
            let sim = sim.clone();
            handles.push(tokio::spawn(async move {
                let trader = Address::new(format!("0x{:x}", i % 5));
                let side = if i % 2 == 0 { Side::Yes } else { Side::No };
                sim.buy(&market(), &trader, side, UNIT + i, 0).await
            }));
        }

        let mut deposited = 0;
        for handle in handles {
            let (_, outcome) = handle.await.unwrap().unwrap();
            deposited += outcome.usdo_in;
        }

        let pool = sim.pool(&market()).await.unwrap();
        assert_eq!(pool.collateral(), 100 * UNIT + deposited);
        assert_eq!(pool.k(), pool.product());
        assert!(pool.yes_balance() > 0 && pool.no_balance() > 0);
    }
}
