use crate::generate_custom_enum;

generate_custom_enum! {
    /// Engineering units reported by the Units property of numeric objects.
    ///
    /// Only the commonly used subset is named; every other standard value
    /// still round-trips through the `Reserved` variant.
    EngineeringUnits {
        SquareMeters = 0,
        SquareFeet = 1,
        Milliamperes = 2,
        Amperes = 3,
        Ohms = 4,
        Volts = 5,
        Kilovolts = 6,
        VoltAmperes = 8,
        KilowattHours = 19,
        Hertz = 27,
        PercentRelativeHumidity = 29,
        Lux = 37,
        Watts = 47,
        Kilowatts = 48,
        Megawatts = 49,
        Pascals = 53,
        Kilopascals = 54,
        Bars = 55,
        DegreesCelsius = 62,
        DegreesKelvin = 63,
        DegreesFahrenheit = 64,
        Hours = 71,
        Minutes = 72,
        Seconds = 73,
        MetersPerSecond = 74,
        Liters = 82,
        LitersPerSecond = 87,
        NoUnits = 95,
        PartsPerMillion = 96,
        Percent = 98,
        RevolutionsPerMinute = 104,
        CubicMetersPerHour = 135,
    },
    u32,
    256..=65535
}
