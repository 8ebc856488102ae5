//! Native configuration file bodies

pub const SYSTEMD_UNIT: &str = r#"[Unit]
Description={{description}}
Requires={{dependencies}}
After={{dependencies}}

[Service]
WorkingDirectory={{work_dir}}
PIDFile=/var/run/{{name}}.pid
User=root
Group=root
ExecStartPre=/bin/rm -f /var/run/{{name}}.pid
ExecStart={{exec}} {{args}}
ExecStopPost=/bin/rm -f /var/run/{{name}}.pid
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
"#;

pub const SYSV_SCRIPT: &str = r#"#! /bin/sh
# chkconfig: 2345 98 17
# description: Starts and stops a single {{name}} instance on this system

if [ -f /etc/rc.d/init.d/functions ]; then
    . /etc/rc.d/init.d/functions
fi

exec="{{path}}"
servname="{{description}}"

proc="{{name}}"
pidfile="/var/run/$proc.pid"
lockfile="/var/lock/subsys/$proc"
logfile="/var/log/{{name}}/$proc.log"

[ -d $(dirname $lockfile) ] || mkdir -p $(dirname $lockfile)

[ -d $(dirname $logfile) ] || mkdir -p $(dirname $logfile)

[ -e /etc/sysconfig/$proc ] && . /etc/sysconfig/$proc

start() {
    [ -x "$exec" ] || exit 5

    if [ -f $pidfile ]; then
        if ! [ -d "/proc/$(cat $pidfile)" ]; then
            rm $pidfile
            if [ -f $lockfile ]; then
                rm $lockfile
            fi
        fi
    fi

    if ! [ -f $pidfile ]; then
        printf "Starting $servname:\t"
        echo "$(date)" >> $logfile
        cd {{exec_dir}}
        "$exec" {{args}} >> $logfile 2>&1 &
        echo $! > $pidfile
        touch $lockfile
        echo
    else
        echo
        printf "$pidfile still exists...\n"
        exit 7
    fi
}

stop() {
    echo -n "Stopping $servname: "
    killproc -p $pidfile $proc
    retval=$?
    echo
    [ $retval -eq 0 ] && rm -f $lockfile
    return $retval
}

restart() {
    stop
    start
}

rh_status() {
    status -p $pidfile $proc
}

rh_status_q() {
    rh_status >/dev/null 2>&1
}

case "$1" in
    start)
        rh_status_q && exit 0
        $1
        ;;
    stop)
        rh_status_q || exit 0
        $1
        ;;
    restart)
        $1
        ;;
    status)
        rh_status
        ;;
    *)
        echo "Usage: $0 {start|stop|status|restart}"
        exit 2
esac

exit $?
"#;

pub const UPSTART_CONF: &str = r#"# {{name}} {{description}}

description     "{{description}}"

start on runlevel [2345]
stop on runlevel [016]

respawn
respawn limit 10 5

chdir {{work_dir}}

script
    exec {{exec}} {{args}} >> /var/log/{{name}}/{{name}}.log 2>&1
end script
"#;

pub const LAUNCHD_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>KeepAlive</key>
    <true/>
    <key>Label</key>
    <string>{{name}}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{{path}}</string>
{{#each arg_list}}        <string>{{this}}</string>
{{/each}}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>WorkingDirectory</key>
    <string>{{work_dir}}</string>
    <key>StandardErrorPath</key>
    <string>/usr/local/var/log/{{name}}.err</string>
    <key>StandardOutPath</key>
    <string>/usr/local/var/log/{{name}}.log</string>
</dict>
</plist>
"#;

pub const RC_SCRIPT: &str = r#"#!/bin/sh

. /etc/rc.subr

name="{{name}}"
rcvar="{{name}}_enable"
command="{{path}}"
pidfile="/var/run/$name.pid"

start_cmd="cd {{exec_dir}} && /usr/sbin/daemon -p $pidfile -f {{exec}} {{args}}"
load_rc_config $name
run_rc_command "$1"
"#;

pub const LOGROTATE_CONF: &str = r#"/var/log/{{name}}/*.log {
    weekly
    maxsize 10M
    rotate 10
    copytruncate
    delaycompress
    compress
    notifempty
    missingok
    su root root
}
"#;
