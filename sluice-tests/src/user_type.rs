use crate::silent_logs;
use sluice::{
    Error, Indicator, Result, Session, TypeConversion, exchange_user_type, into, use_,
};

#[derive(Debug, Clone, PartialEq)]
struct Temperature {
    celsius: f64,
}

impl TypeConversion for Temperature {
    type Base = f64;

    fn from_base(base: &f64, indicator: Indicator) -> Result<Self> {
        if indicator == Indicator::Null {
            return Err(Error::msg("Temperature cannot be null"));
        }
        Ok(Temperature { celsius: *base })
    }

    fn to_base(&self) -> Result<(f64, Indicator)> {
        Ok((self.celsius, Indicator::Ok))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Percent(u8);

impl TypeConversion for Percent {
    type Base = i32;

    fn from_base(base: &i32, _indicator: Indicator) -> Result<Self> {
        match u8::try_from(*base) {
            Ok(v) if v <= 100 => Ok(Percent(v)),
            _ => Err(Error::msg(format!("{} is not a percentage", base))),
        }
    }

    fn to_base(&self) -> Result<(i32, Indicator)> {
        Ok((self.0 as i32, Indicator::Ok))
    }
}

exchange_user_type!(Temperature, Percent);

pub fn user_type(session: &mut Session) {
    session
        .once("drop table if exists sluice_user_type")
        .run()
        .expect("Failed to drop the sluice_user_type table");
    session
        .once("create table sluice_user_type (city varchar(20), temperature double, humidity integer)")
        .run()
        .expect("Failed to create the sluice_user_type table");

    let city = String::from("Turin");
    let temperature = Temperature { celsius: 23.5 };
    let humidity = Percent(61);
    session
        .once("insert into sluice_user_type values (:city, :temperature, :humidity)")
        .exchange(use_(&city))
        .exchange(use_(&temperature))
        .exchange(use_(&humidity))
        .run()
        .expect("Failed to insert user types");

    let mut fetched_temperature = Temperature { celsius: 0.0 };
    let mut fetched_humidity = Percent(0);
    session
        .once("select temperature, humidity from sluice_user_type where city = :city")
        .exchange(into(&mut fetched_temperature))
        .exchange(into(&mut fetched_humidity))
        .exchange(use_(&city))
        .run()
        .expect("Failed to select user types");
    assert_eq!(fetched_temperature, temperature);
    assert_eq!(fetched_humidity, humidity);

    // Conversion failures surface as errors
    silent_logs! {
        let error = session
            .once("select humidity * 2 from sluice_user_type")
            .exchange(into(&mut fetched_humidity))
            .run()
            .expect_err("An invalid percentage must fail");
        assert!(
            format!("{:#}", error).contains("122 is not a percentage"),
            "Unexpected error: {:#}",
            error
        );
    }
    silent_logs! {
        session
            .once("select null")
            .exchange(into(&mut fetched_temperature))
            .run()
            .expect_err("A null temperature must fail");
    }
    assert_eq!(fetched_humidity, humidity);

    session
        .once("drop table sluice_user_type")
        .run()
        .expect("Failed to drop the sluice_user_type table");
}
