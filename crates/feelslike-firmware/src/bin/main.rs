#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::Controller;
use esp_radio::wifi::WifiDevice;
use feelslike_core::cycle::WakeCycle;
use feelslike_core::sensors::SHT40Sensor;
use feelslike_firmware::epaper::EpaperDisplay;
use feelslike_firmware::network::{AdafruitIoConnector, Radio};
use feelslike_firmware::power::{RtcPower, sleep_after_panic};
use feelslike_firmware::rng::HardwareRng;
use feelslike_firmware::settings::build_settings;
use log::{error, info};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("PANIC: {}", info);
    sleep_after_panic()
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let power = RtcPower::new(Rtc::new(peripherals.LPWR));

    // Settings are checked before anything below touches the radio or buses.
    let completed = WakeCycle::boot(build_settings(), power, move || {
        let mut rng = HardwareRng::new(Rng::new());

        // Radio failures are not fatal here: the connector reports them and the
        // cycle decides.
        let radio = match esp_radio::init() {
            Ok(controller) => {
                let controller = &*mk_static!(Controller<'static>, controller);
                match esp_radio::wifi::new(controller, peripherals.WIFI, Default::default()) {
                    Ok((wifi_controller, interfaces)) => {
                        let (stack, runner) = embassy_net::new(
                            interfaces.sta,
                            embassy_net::Config::dhcpv4(Default::default()),
                            mk_static!(StackResources<3>, StackResources::<3>::new()),
                            rng.next_seed(),
                        );
                        spawner.spawn(net_task(runner)).ok();
                        Some(Radio {
                            controller: wifi_controller,
                            stack,
                        })
                    }
                    Err(e) => {
                        error!("Failed to initialize Wi-Fi controller: {:?}", e);
                        None
                    }
                }
            }
            Err(e) => {
                error!("Failed to initialize radio: {:?}", e);
                None
            }
        };
        let connector = AdafruitIoConnector::new(radio, rng);

        // Panics below end in the panic handler's deep sleep.

        // SHT4x on the STEMMA QT port
        let i2c = I2c::new(
            peripherals.I2C0,
            I2cConfig::default().with_frequency(Rate::from_khz(100)),
        )
        .expect("Failed to configure I2C")
        .with_sda(peripherals.GPIO33)
        .with_scl(peripherals.GPIO34)
        .into_async();
        let sensor = SHT40Sensor::new(i2c, embassy_time::Delay);

        // 2.9" e-paper on SPI2
        let spi_bus = Spi::new(
            peripherals.SPI2,
            SpiConfig::default()
                .with_frequency(Rate::from_mhz(4))
                .with_mode(Mode::_0),
        )
        .expect("Failed to configure SPI")
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO35);
        let cs = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
        let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).unwrap();
        let busy = Input::new(
            peripherals.GPIO5,
            InputConfig::default().with_pull(Pull::None),
        );
        let dc = Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default());
        let rst = Output::new(peripherals.GPIO6, Level::High, OutputConfig::default());
        let display = EpaperDisplay::new(spi_device, busy, dc, rst, Delay::new());

        (connector, sensor, display)
    })
    .await;
    match completed.halt {}
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
