use super::super::config::ConfigError;
use super::{ExchangeBackend, ExchangeError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::trace;

/// A reusable barrier that can be torn down when one participant fails.
#[derive(Debug)]
struct Rendezvous {
    parties: usize,
    state: Mutex<RendezvousState>,
    released: Condvar,
}

#[derive(Debug, Default)]
struct RendezvousState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

impl Rendezvous {
    fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(RendezvousState::default()),
            released: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(), ExchangeError> {
        let mut state = self.state.lock().map_err(|_| ExchangeError::Poisoned)?;
        if state.aborted {
            return Err(ExchangeError::Aborted);
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.released.notify_all();
            return Ok(());
        }
        while state.generation == generation && !state.aborted {
            state = self
                .released
                .wait(state)
                .map_err(|_| ExchangeError::Poisoned)?;
        }
        if state.generation == generation {
            Err(ExchangeError::Aborted)
        } else {
            Ok(())
        }
    }

    fn abort(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.aborted = true;
        }
        self.released.notify_all();
    }
}

#[derive(Debug, Clone, Copy)]
struct Offer {
    my_score: f64,
    friend_score: f64,
}

#[derive(Debug)]
struct Board {
    parameters: Vec<HashMap<String, Vec<f64>>>,
    /// Ladder rung currently held by each rank.
    rung_of: Vec<usize>,
    /// Rank currently holding each rung.
    rank_at: Vec<usize>,
    offers: Vec<Option<Offer>>,
}

#[derive(Debug)]
struct Shared {
    seed: u64,
    board: Mutex<Board>,
    rendezvous: Rendezvous,
}

impl Shared {
    fn board(&self) -> Result<MutexGuard<'_, Board>, ExchangeError> {
        self.board.lock().map_err(|_| ExchangeError::Poisoned)
    }
}

#[derive(Debug, Clone, Copy)]
struct Pairing {
    frame: u64,
    my_rung: usize,
    friend_rung: usize,
    friend: usize,
}

/// Creates the connected ranks of an in-process replica group.
///
/// Rank `i` starts on ladder rung `i`. Ranks pair by the rung they currently hold:
/// even frames pair rungs (0, 1), (2, 3), ... and odd frames pair (1, 2), (3, 4), ...;
/// a rung without a neighbour is its own partner.
#[derive(Debug, Clone)]
pub struct LocalExchangeHub {
    shared: Arc<Shared>,
    replicas: usize,
}

impl LocalExchangeHub {
    pub fn new(replicas: usize, seed: u64) -> Result<Self, ConfigError> {
        if replicas == 0 {
            return Err(ConfigError::NoReplicas);
        }
        let board = Board {
            parameters: vec![HashMap::new(); replicas],
            rung_of: (0..replicas).collect(),
            rank_at: (0..replicas).collect(),
            offers: vec![None; replicas],
        };
        Ok(Self {
            shared: Arc::new(Shared {
                seed,
                board: Mutex::new(board),
                rendezvous: Rendezvous::new(replicas),
            }),
            replicas,
        })
    }

    /// One backend per replica, in rank order. Each must be driven from its own thread.
    pub fn ranks(&self) -> Vec<LocalExchange> {
        (0..self.replicas)
            .map(|rank| LocalExchange {
                shared: Arc::clone(&self.shared),
                rank,
                replicas: self.replicas,
                pairing: None,
            })
            .collect()
    }

    pub fn abort(&self) {
        self.shared.rendezvous.abort();
    }
}

/// One rank of a [`LocalExchangeHub`].
#[derive(Debug)]
pub struct LocalExchange {
    shared: Arc<Shared>,
    rank: usize,
    replicas: usize,
    pairing: Option<Pairing>,
}

impl LocalExchange {
    fn check_index(&self, index: usize) -> Result<(), ExchangeError> {
        if index < self.replicas {
            Ok(())
        } else {
            Err(ExchangeError::ReplicaOutOfRange {
                index,
                replicas: self.replicas,
            })
        }
    }

    /// The ladder rung this rank currently holds.
    pub fn current_rung(&self) -> Result<usize, ExchangeError> {
        Ok(self.shared.board()?.rung_of[self.rank])
    }
}

fn partner_rung(rung: usize, frame: u64, replicas: usize) -> usize {
    let pairs_up = (rung % 2 == 0) == (frame % 2 == 0);
    if pairs_up {
        if rung + 1 < replicas { rung + 1 } else { rung }
    } else if rung > 0 {
        rung - 1
    } else {
        rung
    }
}

/// Seed shared by both partners of one exchange.
fn decision_seed(seed: u64, frame: u64, lower_rung: usize) -> u64 {
    let mut z = seed
        ^ frame.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (lower_rung as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl ExchangeBackend for LocalExchange {
    fn number_of_replicas(&self) -> usize {
        self.replicas
    }

    fn my_index(&self) -> usize {
        self.rank
    }

    fn set_parameter(&mut self, key: &str, values: Vec<f64>) -> Result<(), ExchangeError> {
        self.shared.board()?.parameters[self.rank].insert(key.to_string(), values);
        Ok(())
    }

    fn get_parameter(&self, key: &str) -> Result<Vec<f64>, ExchangeError> {
        self.get_friend_parameter(key, self.rank)
    }

    fn get_friend_index(&mut self, frame: u64) -> Result<usize, ExchangeError> {
        // Every rank has finished the previous round once this returns.
        self.shared.rendezvous.wait()?;
        let board = self.shared.board()?;
        let my_rung = board.rung_of[self.rank];
        let friend_rung = partner_rung(my_rung, frame, self.replicas);
        let friend = board.rank_at[friend_rung];
        self.pairing = Some(Pairing {
            frame,
            my_rung,
            friend_rung,
            friend,
        });
        Ok(friend)
    }

    fn get_friend_parameter(&self, key: &str, friend: usize) -> Result<Vec<f64>, ExchangeError> {
        self.check_index(friend)?;
        self.shared.board()?.parameters[friend]
            .get(key)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownParameter {
                key: key.to_string(),
                replica: friend,
            })
    }

    fn do_exchange(
        &mut self,
        my_score: f64,
        friend_score: f64,
        friend: usize,
    ) -> Result<bool, ExchangeError> {
        self.check_index(friend)?;
        let pairing = self.pairing.take().ok_or(ExchangeError::NoPartner)?;
        if pairing.friend != friend {
            // Still arrive at the rendezvous so the other ranks are not left waiting.
            self.shared.board()?.offers[self.rank] = None;
            self.shared.rendezvous.wait()?;
            return Err(ExchangeError::FriendMismatch {
                requested: friend,
                expected: pairing.friend,
            });
        }

        self.shared.board()?.offers[self.rank] = Some(Offer {
            my_score,
            friend_score,
        });
        self.shared.rendezvous.wait()?;

        if friend == self.rank {
            return Ok(false);
        }

        let mut board = self.shared.board()?;
        let (Some(mine), Some(theirs)) = (board.offers[self.rank], board.offers[friend]) else {
            return Ok(false);
        };
        let (lower, upper, lower_rung) = if pairing.my_rung < pairing.friend_rung {
            (mine, theirs, pairing.my_rung)
        } else {
            (theirs, mine, pairing.friend_rung)
        };
        let delta = (lower.my_score - lower.friend_score) + (upper.my_score - upper.friend_score);
        let mut rng = StdRng::seed_from_u64(decision_seed(self.shared.seed, pairing.frame, lower_rung));
        let draw = rng.r#gen::<f64>();
        let accepted = delta >= 0.0 || delta.exp() > draw;

        if accepted {
            board.rung_of[self.rank] = pairing.friend_rung;
            board.rank_at[pairing.friend_rung] = self.rank;
        }
        trace!(
            rank = self.rank,
            friend,
            frame = pairing.frame,
            delta,
            accepted,
            "Exchange decision"
        );
        Ok(accepted)
    }

    fn abort(&self) {
        self.shared.rendezvous.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn partner_rungs_alternate_between_frames() {
        let even: Vec<usize> = (0..4).map(|r| partner_rung(r, 0, 4)).collect();
        assert_eq!(even, vec![1, 0, 3, 2]);
        let odd: Vec<usize> = (0..4).map(|r| partner_rung(r, 1, 4)).collect();
        assert_eq!(odd, vec![0, 2, 1, 3]);
        let odd_count: Vec<usize> = (0..3).map(|r| partner_rung(r, 0, 3)).collect();
        assert_eq!(odd_count, vec![1, 0, 2]);
    }

    #[test]
    fn zero_replicas_is_a_configuration_error() {
        assert!(matches!(
            LocalExchangeHub::new(0, 1),
            Err(ConfigError::NoReplicas)
        ));
    }

    /// Runs `rounds` exchange rounds on `n` threads. Each rank offers scores that favour
    /// swapping when `favour` is true and forbid it otherwise.
    fn run_rounds(n: usize, rounds: u64, seed: u64, favour: bool) -> Vec<Vec<(usize, bool)>> {
        let hub = LocalExchangeHub::new(n, seed).unwrap();
        thread::scope(|scope| {
            let handles: Vec<_> = hub
                .ranks()
                .into_iter()
                .map(|mut rank| {
                    scope.spawn(move || {
                        let mut log = Vec::new();
                        for frame in 0..rounds {
                            let friend = rank.get_friend_index(frame).unwrap();
                            let (my, other) = if favour { (1.0, 0.0) } else { (0.0, 1e6) };
                            let accepted = rank.do_exchange(my, other, friend).unwrap();
                            log.push((friend, accepted));
                        }
                        log
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn partners_observe_the_same_decision() {
        let logs = run_rounds(4, 50, 17, true);
        for (rank, log) in logs.iter().enumerate() {
            for (frame, &(friend, accepted)) in log.iter().enumerate() {
                let (their_friend, their_accepted) = logs[friend][frame];
                assert_eq!(their_friend, rank);
                assert_eq!(their_accepted, accepted);
                if friend == rank {
                    assert!(!accepted);
                }
            }
        }
    }

    #[test]
    fn favourable_swaps_are_always_accepted() {
        let logs = run_rounds(4, 10, 3, true);
        // On even frames every rank is paired; on odd frames the ladder ends sit out.
        for log in &logs {
            for (frame, &(_, accepted)) in log.iter().enumerate() {
                if frame % 2 == 0 {
                    assert!(accepted);
                }
            }
        }
    }

    #[test]
    fn forbidden_swaps_are_never_accepted() {
        let logs = run_rounds(4, 20, 5, false);
        assert!(logs.iter().flatten().all(|&(_, accepted)| !accepted));
    }

    #[test]
    fn parameters_are_visible_to_other_ranks() {
        let hub = LocalExchangeHub::new(2, 0).unwrap();
        let mut ranks = hub.ranks();
        ranks[1].set_parameter("temp", vec![2.0]).unwrap();
        assert_eq!(ranks[0].get_friend_parameter("temp", 1).unwrap(), vec![2.0]);
        assert!(matches!(
            ranks[0].get_parameter("temp"),
            Err(ExchangeError::UnknownParameter { replica: 0, .. })
        ));
        assert!(matches!(
            ranks[0].get_friend_parameter("temp", 5),
            Err(ExchangeError::ReplicaOutOfRange { .. })
        ));
    }

    #[test]
    fn abort_releases_waiting_ranks() {
        let hub = LocalExchangeHub::new(2, 0).unwrap();
        let mut ranks = hub.ranks();
        let mut waiting = ranks.remove(0);
        let failed = ranks.remove(0);
        thread::scope(|scope| {
            let handle = scope.spawn(move || waiting.get_friend_index(0));
            failed.abort();
            assert_eq!(handle.join().unwrap(), Err(ExchangeError::Aborted));
        });
    }

    #[test]
    fn exchange_without_partner_is_an_error() {
        let hub = LocalExchangeHub::new(1, 0).unwrap();
        let mut rank = hub.ranks().remove(0);
        assert_eq!(rank.do_exchange(0.0, 0.0, 0), Err(ExchangeError::NoPartner));
    }
}
