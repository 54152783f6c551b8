use clap::Parser;
use ddc_core::mk_static;
use ddc_core::utils::controllers::{DutyOutput, PwmChannel, SystemClock};
use ddc_core::utils::{
    connection::link::DEFAULT_MAX_RETRIES, http, wait_for_network, Duration, MotionConfig,
    MotionSystem, NetworkJoin,
};
use embassy_executor::{Executor, Spawner};
use embassy_net::{Config, Ipv4Address, Ipv4Cidr, Runner, StackResources};
use embassy_net_tuntap::TunTapDevice;
use heapless::Vec;
use rand_core::{OsRng, RngCore};
use static_cell::StaticCell;
use std::convert::Infallible;
use tracing::{error, info};

type System = MotionSystem<LoggingPwm, SystemClock>;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// TAP device name
    #[clap(long, default_value = "tap0")]
    tap: String,
    /// use a static IP instead of DHCP
    #[clap(long)]
    static_ip: bool,
    /// HTTP port of the control server
    #[clap(long, default_value_t = 8000)]
    port: u16,
    /// stop the motors after this long without a command
    #[clap(long, default_value_t = 10_000)]
    timeout_ms: u64,
    /// safety supervisor period
    #[clap(long, default_value_t = 1_000)]
    poll_ms: u64,
    /// speed used when a request has no valid speed
    #[clap(long, default_value_t = 200)]
    default_speed: u8,
    /// reconnect attempts before the network join gives up
    #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u8,
}

/// PWM backend that logs every committed duty instead of driving pins.
#[derive(Default)]
struct LoggingPwm {
    staged: [u8; 4],
}

impl DutyOutput for LoggingPwm {
    type Error = Infallible;

    fn set_duty(
        &mut self,
        channel: PwmChannel,
        duty: u8,
    ) -> Result<(), Self::Error> {
        self.staged[channel.index()] = duty;
        Ok(())
    }

    fn commit(
        &mut self,
        channel: PwmChannel,
    ) -> Result<(), Self::Error> {
        info!(?channel, duty = self.staged[channel.index()], "PWM commit");
        Ok(())
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, TunTapDevice>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn safety_task(system: &'static System) -> ! {
    system.supervise().await
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();

    let motion_config = MotionConfig::default()
        .with_timeout(Duration::from_millis(opts.timeout_ms))
        .with_poll_interval(Duration::from_millis(opts.poll_ms))
        .with_default_speed(opts.default_speed);

    let system = &*mk_static!(
        System,
        MotionSystem::new(LoggingPwm::default(), SystemClock, Some(motion_config))
    );
    if let Err(e) = system.stop().await {
        error!("initial stop failed: {:?}", e);
    }

    let device = match TunTapDevice::new(&opts.tap) {
        Ok(device) => device,
        Err(e) => {
            error!("failed to open TAP device {}: {:?}", opts.tap, e);
            return;
        }
    };
    let config = if opts.static_ip {
        Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: Ipv4Cidr::new(Ipv4Address::new(192, 168, 69, 2), 24),
            dns_servers: Vec::new(),
            gateway: Some(Ipv4Address::new(192, 168, 69, 1)),
        })
    } else {
        Config::dhcpv4(Default::default())
    };
    let mut seed_buf = [0; 8];
    OsRng.fill_bytes(&mut seed_buf);
    let seed = u64::from_le_bytes(seed_buf);

    static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        device,
        config,
        RESOURCES.init(StackResources::<3>::new()),
        seed,
    );
    spawner.must_spawn(net_task(runner));

    let mut join = NetworkJoin::new(opts.max_retries);
    if let Err(e) = wait_for_network(stack, &mut join).await {
        error!("network unavailable: {:?}", e);
        return;
    }

    spawner.must_spawn(safety_task(system));

    info!("Starting control server on port {}", opts.port);
    http(0, opts.port, stack, system, None).await;
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(main_task(spawner));
    });
}
