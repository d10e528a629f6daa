use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{
    communicator::MCPCommunicator,
    config::ServerConfig,
    error::AegisError,
    executor::TestExecutor,
    handshake::HandshakeDriver,
    reporter::SuiteReport,
    test_model::TestSuite,
};

/// Orchestrates one full run: spawn, handshake, execute every suite in
/// order, shut down, and hand back per-suite results for the [`crate::reporter::Reporter`]
/// (`SPEC_FULL.md` §4 "Runner").
pub struct Runner {
    executor: TestExecutor,
}

pub struct RunOutcome {
    pub suites: Vec<SuiteReport>,
    pub elapsed: Duration,
}

impl Runner {
    pub fn new(read_timeout: Option<Duration>) -> Self {
        Self {
            executor: TestExecutor::new(read_timeout),
        }
    }

    pub async fn run(
        &self,
        config: &ServerConfig,
        suites: &[TestSuite],
    ) -> Result<RunOutcome, AegisError> {
        let started = Instant::now();
        info!(server = %config.name, "starting server under test");

        let communicator = MCPCommunicator::start(config).await?;
        HandshakeDriver::run(&communicator, config).await?;

        let mut reports = Vec::with_capacity(suites.len());

        'suites: for suite in suites {
            let mut tests = Vec::with_capacity(suite.tests.len());
            for test in &suite.tests {
                let result = self.executor.run(&communicator, test).await;
                let process_alive = communicator.is_running();
                tests.push(result);

                if !process_alive {
                    warn!(
                        suite = %suite.description,
                        "server exited mid-suite; aborting remaining suites"
                    );
                    reports.push(SuiteReport {
                        description: suite.description.clone(),
                        tests,
                    });
                    break 'suites;
                }
            }
            reports.push(SuiteReport {
                description: suite.description.clone(),
                tests,
            });
        }

        communicator.stop().await;

        Ok(RunOutcome {
            suites: reports,
            elapsed: started.elapsed(),
        })
    }
}
